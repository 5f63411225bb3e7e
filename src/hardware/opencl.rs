//! OpenCL backend for GPU enumeration
//!
//! The ICD loader is opened at runtime with libloading, so the crate builds
//! and runs on machines without OpenCL installed.

use libloading::Library;
use std::ffi::{c_void, OsStr};
use std::path::Path;
use std::ptr;
use tracing::{debug, trace};

use super::gpu::ComputeApi;
use crate::error::{ProbeError, Result};

type ClInt = i32;
type ClUint = u32;
type ClPlatformId = *mut c_void;
type ClDeviceId = *mut c_void;

const CL_SUCCESS: ClInt = 0;
const CL_DEVICE_NOT_FOUND: ClInt = -1;
const CL_DEVICE_TYPE_GPU: u64 = 1 << 2;
const CL_DEVICE_GLOBAL_MEM_CACHE_SIZE: ClUint = 0x101E;
const CL_DEVICE_GLOBAL_MEM_SIZE: ClUint = 0x101F;
const CL_DEVICE_NAME: ClUint = 0x102B;
const CL_DEVICE_VENDOR: ClUint = 0x102C;

type GetPlatformIds = unsafe extern "C" fn(ClUint, *mut ClPlatformId, *mut ClUint) -> ClInt;
type GetDeviceIds =
    unsafe extern "C" fn(ClPlatformId, u64, ClUint, *mut ClDeviceId, *mut ClUint) -> ClInt;
type GetDeviceInfo =
    unsafe extern "C" fn(ClDeviceId, ClUint, usize, *mut c_void, *mut usize) -> ClInt;

#[cfg(target_os = "windows")]
const DEFAULT_LIBRARIES: &[&str] = &["OpenCL.dll"];
#[cfg(target_os = "macos")]
const DEFAULT_LIBRARIES: &[&str] = &["/System/Library/Frameworks/OpenCL.framework/OpenCL"];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const DEFAULT_LIBRARIES: &[&str] = &["libOpenCL.so.1", "libOpenCL.so"];

/// Platform handle returned by `clGetPlatformIDs`
#[derive(Debug, Clone, Copy)]
pub struct PlatformId(ClPlatformId);

/// Device handle returned by `clGetDeviceIDs`
#[derive(Debug, Clone, Copy)]
pub struct DeviceId(ClDeviceId);

/// A loaded OpenCL ICD loader
pub struct OpenClLibrary {
    // Keeps the function pointers below valid
    _library: Library,
    get_platform_ids: GetPlatformIds,
    get_device_ids: GetDeviceIds,
    get_device_info: GetDeviceInfo,
}

impl OpenClLibrary {
    /// Load `path`, or the first platform default that opens
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let library = match path {
            Some(path) => open_library(path.as_os_str())?,
            None => {
                let mut last_error = None;
                let mut opened = None;
                for name in DEFAULT_LIBRARIES {
                    match open_library(OsStr::new(name)) {
                        Ok(library) => {
                            opened = Some(library);
                            break;
                        }
                        Err(err) => last_error = Some(err),
                    }
                }
                match opened {
                    Some(library) => library,
                    None => {
                        return Err(last_error.unwrap_or_else(|| {
                            ProbeError::LibraryLoad("no candidate libraries".to_string())
                        }))
                    }
                }
            }
        };

        Self::from_library(library)
    }

    fn from_library(library: Library) -> Result<Self> {
        unsafe {
            let get_platform_ids: GetPlatformIds = *library
                .get(b"clGetPlatformIDs\0")
                .map_err(|e| ProbeError::MissingSymbol(format!("clGetPlatformIDs: {}", e)))?;
            let get_device_ids: GetDeviceIds = *library
                .get(b"clGetDeviceIDs\0")
                .map_err(|e| ProbeError::MissingSymbol(format!("clGetDeviceIDs: {}", e)))?;
            let get_device_info: GetDeviceInfo = *library
                .get(b"clGetDeviceInfo\0")
                .map_err(|e| ProbeError::MissingSymbol(format!("clGetDeviceInfo: {}", e)))?;

            Ok(Self {
                _library: library,
                get_platform_ids,
                get_device_ids,
                get_device_info,
            })
        }
    }

    fn info_u64(&self, device: &DeviceId, param: ClUint, call: &'static str) -> Result<u64> {
        let mut value: u64 = 0;
        let status = unsafe {
            (self.get_device_info)(
                device.0,
                param,
                std::mem::size_of::<u64>(),
                (&mut value as *mut u64).cast(),
                ptr::null_mut(),
            )
        };
        check(call, status)?;
        Ok(value)
    }

    fn info_string(&self, device: &DeviceId, param: ClUint, call: &'static str) -> Result<String> {
        let mut size: usize = 0;
        let status =
            unsafe { (self.get_device_info)(device.0, param, 0, ptr::null_mut(), &mut size) };
        check(call, status)?;

        let mut buffer = vec![0u8; size];
        let status = unsafe {
            (self.get_device_info)(
                device.0,
                param,
                buffer.len(),
                buffer.as_mut_ptr().cast(),
                ptr::null_mut(),
            )
        };
        check(call, status)?;

        let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
        Ok(String::from_utf8_lossy(&buffer[..end]).into_owned())
    }
}

fn open_library(name: &OsStr) -> Result<Library> {
    let library = unsafe { Library::new(name) }.map_err(|e| {
        ProbeError::LibraryLoad(format!("{}: {}", Path::new(name).display(), e))
    })?;
    debug!(library = %Path::new(name).display(), "loaded OpenCL ICD loader");
    Ok(library)
}

fn check(call: &'static str, status: ClInt) -> Result<()> {
    if status == CL_SUCCESS {
        Ok(())
    } else {
        Err(ProbeError::ComputeApi { call, status })
    }
}

fn log_failure<T>(result: Result<T>) -> Option<T> {
    result
        .map_err(|err| debug!(error = %err, "OpenCL device query failed"))
        .ok()
}

impl ComputeApi for OpenClLibrary {
    type Platform = PlatformId;
    type Device = DeviceId;

    fn platforms(&self, capacity: usize) -> Vec<PlatformId> {
        let mut ids: Vec<ClPlatformId> = vec![ptr::null_mut(); capacity];
        let mut available: ClUint = 0;
        let status =
            unsafe { (self.get_platform_ids)(capacity as ClUint, ids.as_mut_ptr(), &mut available) };

        if let Err(err) = check("clGetPlatformIDs", status) {
            debug!(error = %err, "no OpenCL platforms");
            return Vec::new();
        }

        ids.truncate((available as usize).min(capacity));
        trace!(platforms = ids.len(), "OpenCL platforms");
        ids.into_iter().map(PlatformId).collect()
    }

    fn gpu_devices(&self, platform: &PlatformId, capacity: usize) -> Vec<DeviceId> {
        let mut ids: Vec<ClDeviceId> = vec![ptr::null_mut(); capacity];
        let mut available: ClUint = 0;
        let status = unsafe {
            (self.get_device_ids)(
                platform.0,
                CL_DEVICE_TYPE_GPU,
                capacity as ClUint,
                ids.as_mut_ptr(),
                &mut available,
            )
        };

        match status {
            CL_SUCCESS => {}
            CL_DEVICE_NOT_FOUND => return Vec::new(),
            _ => {
                let err = ProbeError::ComputeApi {
                    call: "clGetDeviceIDs",
                    status,
                };
                debug!(error = %err, "skipping OpenCL platform");
                return Vec::new();
            }
        }

        ids.truncate((available as usize).min(capacity));
        ids.into_iter().map(DeviceId).collect()
    }

    fn vendor_name(&self, device: &DeviceId) -> Option<String> {
        log_failure(self.info_string(device, CL_DEVICE_VENDOR, "CL_DEVICE_VENDOR"))
    }

    fn device_name(&self, device: &DeviceId) -> Option<String> {
        log_failure(self.info_string(device, CL_DEVICE_NAME, "CL_DEVICE_NAME"))
    }

    fn global_memory_size(&self, device: &DeviceId) -> Option<u64> {
        log_failure(self.info_u64(device, CL_DEVICE_GLOBAL_MEM_SIZE, "CL_DEVICE_GLOBAL_MEM_SIZE"))
    }

    fn global_memory_cache_size(&self, device: &DeviceId) -> Option<u64> {
        log_failure(self.info_u64(
            device,
            CL_DEVICE_GLOBAL_MEM_CACHE_SIZE,
            "CL_DEVICE_GLOBAL_MEM_CACHE_SIZE",
        ))
    }
}
