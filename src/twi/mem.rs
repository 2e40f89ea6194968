// Copyright (c) 2026 The nixie-rtc developers
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
// THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::ptr;

use libc::{self, c_void, off_t, size_t, MAP_FAILED, MAP_SHARED, O_SYNC, PROT_READ, PROT_WRITE};
use log::debug;

use super::registers::{Register, TwiRegisters};
use super::{Error, Result};

const PATH_DEV_MEM: &str = "/dev/mem";

/// Volatile access to a memory-mapped TWI register block.
///
/// `TwiMem` either maps the block from physical memory through `/dev/mem`
/// ([`open`]), or wraps a pointer to a block that's already addressable
/// ([`from_ptr`]), such as the data-space registers on an AVR.
///
/// [`open`]: #method.open
/// [`from_ptr`]: #method.from_ptr
pub struct TwiMem {
    mem_ptr: *mut u8,
    // Page-aligned mapping to release on drop, if we created one.
    mapping: Option<(*mut c_void, size_t)>,
}

impl fmt::Debug for TwiMem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwiMem")
            .field("mem_ptr", &self.mem_ptr)
            .field("mapped", &self.mapping.is_some())
            .finish()
    }
}

impl TwiMem {
    /// Maps the register block starting at physical address `base`.
    ///
    /// `base` is the board-specific physical address of a TWI-compatible
    /// register block on the host. Never pass a microcontroller data-space
    /// address such as [`ATMEGA328P_TWI_BASE`] here. Use [`from_ptr`] for
    /// those. Addresses inside the first page of physical memory return an
    /// `io::ErrorKind::InvalidInput` error without touching `/dev/mem`.
    ///
    /// Requires read/write access to `/dev/mem`, which usually means
    /// running as root.
    ///
    /// [`ATMEGA328P_TWI_BASE`]: constant.ATMEGA328P_TWI_BASE.html
    /// [`from_ptr`]: #method.from_ptr
    pub fn open(base: usize) -> Result<TwiMem> {
        let page_size = match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
            size if size > 0 => size as usize,
            _ => return Err(Error::Io(io::Error::last_os_error())),
        };

        let page_base = base & !(page_size - 1);
        if page_base == 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("0x{:X} isn't a physical register block address", base),
            )));
        }

        let page_offset = base - page_base;
        let map_size = page_offset + super::REGISTER_COUNT;

        let mem_file = match OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(O_SYNC)
            .open(PATH_DEV_MEM)
        {
            Ok(file) => file,
            Err(ref e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(Error::PermissionDenied(String::from(PATH_DEV_MEM)));
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let map_ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                map_size,
                PROT_READ | PROT_WRITE,
                MAP_SHARED,
                mem_file.as_raw_fd(),
                page_base as off_t,
            )
        };

        if map_ptr == MAP_FAILED {
            return Err(Error::Io(io::Error::last_os_error()));
        }

        debug!("Mapped TWI registers at 0x{:X} ({} bytes)", base, map_size);

        Ok(TwiMem {
            mem_ptr: unsafe { (map_ptr as *mut u8).add(page_offset) },
            mapping: Some((map_ptr, map_size as size_t)),
        })
    }

    /// Wraps a register block that's directly addressable at `mem_ptr`.
    ///
    /// # Safety
    ///
    /// `mem_ptr` must point to a readable and writable TWI register block
    /// that stays valid for the lifetime of the returned `TwiMem`, and no
    /// other code may access the block in the meantime.
    pub unsafe fn from_ptr(mem_ptr: *mut u8) -> TwiMem {
        TwiMem {
            mem_ptr,
            mapping: None,
        }
    }
}

impl TwiRegisters for TwiMem {
    #[inline(always)]
    fn read(&mut self, register: Register) -> u8 {
        unsafe { ptr::read_volatile(self.mem_ptr.add(register.offset())) }
    }

    #[inline(always)]
    fn write(&mut self, register: Register, value: u8) {
        unsafe {
            ptr::write_volatile(self.mem_ptr.add(register.offset()), value);
        }
    }
}

impl Drop for TwiMem {
    fn drop(&mut self) {
        if let Some((map_ptr, map_size)) = self.mapping.take() {
            unsafe {
                libc::munmap(map_ptr, map_size);
            }
        }
    }
}

// Required because of the raw pointer to our register block
unsafe impl Send for TwiMem {}
