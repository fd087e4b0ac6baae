use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;
use std::path::PathBuf;
use tracing::warn;
use windows::core::PCWSTR;
use windows::Win32::Foundation::HMODULE;
use windows::Win32::System::LibraryLoader::{
    GetModuleFileNameW, GetModuleHandleExW, GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS,
    GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
};

const MAX_MODULE_PATH: usize = 32_768;

/// Directory containing the module this code was linked into.
///
/// For the plugin DLL this is the DLL's own folder, not the host executable's.
pub fn module_directory() -> Option<PathBuf> {
    let mut module = HMODULE::default();
    let anchor = module_directory as *const () as *const u16;

    let found = unsafe {
        GetModuleHandleExW(
            GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS | GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
            PCWSTR(anchor),
            &mut module,
        )
    };
    if let Err(e) = found {
        warn!("GetModuleHandleExW failed: {}", e);
        return None;
    }

    let mut buffer = vec![0u16; MAX_MODULE_PATH];
    let len = unsafe { GetModuleFileNameW(Some(module), &mut buffer) } as usize;
    if len == 0 || len >= buffer.len() {
        warn!("GetModuleFileNameW returned no usable path");
        return None;
    }

    let path = PathBuf::from(OsString::from_wide(&buffer[..len]));
    path.parent().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_directory_exists() {
        let dir = module_directory().expect("module directory");
        assert!(dir.is_dir());
    }
}
