//! C ABI entry points called by the overlay host.

#![allow(non_snake_case)]

use crate::config::PluginConfig;
use crate::imgui_ui::{self, ImguiUi};
use crate::{logging, settings_panel, Plugin, ADDON_CAP_HAS_SETTINGS, ADDON_NAME, ADDON_VERSION};
use passthru_core::{Backend, ThreadScheduler};
use passthru_platform_win32::{hook, module_directory, Win32Platform};
use std::ffi::{c_char, c_void};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, warn};

static PLUGIN: Mutex<Option<Plugin>> = Mutex::new(None);

/// UI context handed over by the host, kept as an address.
static UI_CONTEXT: AtomicUsize = AtomicUsize::new(0);

fn initialize() {
    let mut slot = PLUGIN.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        debug!("AddonInitialize called again, ignoring");
        return;
    }

    let dir = module_directory();
    let (config, warnings) = dir
        .as_deref()
        .map(PluginConfig::load_from_dir)
        .unwrap_or_default();

    // Without a log file the plugin still works; a host subscriber may
    // still pick up the warning.
    let log_error = dir
        .as_deref()
        .and_then(|dir| logging::init(dir, &config.logging).err());
    for w in &warnings {
        warn!("Config: {} - {}", w.field, w.message);
    }
    if let Some(e) = log_error {
        warn!("File logging disabled: {:#}", e);
    }

    let platform = Arc::new(Win32Platform::new());
    let backend = Backend {
        windows: platform.clone(),
        keyboard: platform.clone(),
        input: platform,
        scheduler: Arc::new(ThreadScheduler),
    };
    let plugin = Plugin::new(backend, &config);
    hook::attach(Arc::clone(plugin.controller()));

    if let Err(e) = plugin.start() {
        error!("Failed to start: {}", e);
        hook::detach();
        return;
    }
    *slot = Some(plugin);
}

fn shutdown() {
    let plugin = PLUGIN
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();

    let Some(plugin) = plugin else {
        debug!("AddonShutdown without a running instance");
        return;
    };

    // Restore while still attached so messages sent during the restore
    // reach the original procedures.
    plugin.shutdown();
    hook::detach();
    UI_CONTEXT.store(0, Ordering::SeqCst);
}

/// # Safety
///
/// Called by the host on its loader thread. `ui_context` is the host's ImGui
/// context, and `alloc`/`free` its ImGui allocator pair for `user_data`;
/// any of them may be null.
#[no_mangle]
pub unsafe extern "C" fn AddonInitialize(
    _host: *mut c_void,
    ui_context: *mut c_void,
    alloc: *mut c_void,
    free: *mut c_void,
    user_data: *mut c_void,
) {
    imgui_ui::set_allocator(alloc, free, user_data);
    UI_CONTEXT.store(ui_context as usize, Ordering::SeqCst);
    if catch_unwind(AssertUnwindSafe(initialize)).is_err() {
        error!("Panic in AddonInitialize");
    }
}

#[no_mangle]
pub extern "C" fn AddonShutdown() {
    if catch_unwind(AssertUnwindSafe(shutdown)).is_err() {
        error!("Panic in AddonShutdown");
    }
}

#[no_mangle]
pub extern "C" fn GetAddonCapabilities() -> u32 {
    ADDON_CAP_HAS_SETTINGS
}

#[no_mangle]
pub extern "C" fn GetAddonName() -> *const c_char {
    ADDON_NAME.as_ptr() as *const c_char
}

#[no_mangle]
pub extern "C" fn GetAddonVersion() -> *const c_char {
    ADDON_VERSION.as_ptr() as *const c_char
}

fn render_settings(context: *mut imgui_sys::ImGuiContext) {
    let controller = match PLUGIN
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
    {
        Some(plugin) => Arc::clone(plugin.controller()),
        None => return,
    };
    // The host calls this from its render thread inside a frame.
    let mut ui = unsafe { ImguiUi::bind(context) };
    settings_panel::render(&mut ui, &controller);
}

/// Draw the settings panel into the host's current ImGui window.
#[no_mangle]
pub extern "C" fn AddonRenderSettings() {
    let context = UI_CONTEXT.load(Ordering::SeqCst) as *mut imgui_sys::ImGuiContext;
    if context.is_null() {
        return;
    }
    if catch_unwind(AssertUnwindSafe(|| render_settings(context))).is_err() {
        error!("Panic in AddonRenderSettings");
    }
}
