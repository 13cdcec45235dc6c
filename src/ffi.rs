use crate::error::RingError;
use crate::MPMC::Buffer::{RingBuffer, MAX_FRAGMENT_SIZE};
use libc::{c_int, size_t, ssize_t};
use std::ptr;
use std::sync::Arc;

// Error codes
pub const FRB_SUCCESS: c_int = 0;
pub const FRB_ERROR_NULL_POINTER: c_int = -1;
pub const FRB_ERROR_INVALID_CAPACITY: c_int = -2;
pub const FRB_ERROR_ALLOCATION_FAILED: c_int = -3;
pub const FRB_ERROR_TOO_LARGE: c_int = -4;
pub const FRB_ERROR_EMPTY: c_int = -5;
pub const FRB_ERROR_CLOSED: c_int = -6;
pub const FRB_ERROR_PRECONDITION: c_int = -7;
pub const FRB_ERROR_TIMEOUT: c_int = -8;

fn error_code(err: &RingError) -> c_int {
    match err {
        RingError::InvalidCapacity { .. } => FRB_ERROR_INVALID_CAPACITY,
        RingError::AllocationFailure { .. } => FRB_ERROR_ALLOCATION_FAILED,
        RingError::WriteTooLarge { .. } => FRB_ERROR_TOO_LARGE,
        RingError::PreconditionViolation(_) => FRB_ERROR_PRECONDITION,
        RingError::Timeout => FRB_ERROR_TIMEOUT,
        RingError::Closed => FRB_ERROR_CLOSED,
    }
}

/// Handle to a ring buffer instance (opaque pointer)
///
/// # Safety
///
/// Every `frb_*` function dereferences the handle it is given. The pointer
/// must come from `frb_ring_buffer_new` and must not have been passed to a
/// successful `frb_ring_buffer_destroy`. Each call holds its own reference to
/// the ring while it runs, so a destroy racing a call already inside the ring
/// fails with `FRB_ERROR_PRECONDITION` instead of freeing it; close the ring,
/// let blocked callers return, then destroy again. A call that starts after a
/// successful destroy is a use-after-free.
pub struct RingBufferHandle {
    inner: Arc<RingBuffer>,
}

/// One fragment copied out of the ring, laid out for C callers.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FrbFragment {
    pub total_length: u64,
    pub fragment_offset: u64,
    pub len: size_t,
    pub data: [u8; MAX_FRAGMENT_SIZE],
}

/// Create a new ring buffer.
///
/// # Arguments
/// * `capacity` - Number of slots (at least 2; one is kept as the sentinel).
///
/// # Returns
/// * Pointer to `RingBufferHandle`, or NULL on failure.
#[no_mangle]
pub extern "C" fn frb_ring_buffer_new(capacity: size_t) -> *mut RingBufferHandle {
    match RingBuffer::with_capacity(capacity) {
        Ok(ring) => Box::into_raw(Box::new(RingBufferHandle {
            inner: Arc::new(ring),
        })),
        Err(e) => {
            tracing::error!(capacity, error = %e, "FFI: failed to create ring buffer");
            ptr::null_mut()
        }
    }
}

fn ring_of(handle: *mut RingBufferHandle) -> Arc<RingBuffer> {
    // SAFETY: callers check for null; validity is the caller's contract.
    unsafe { (*handle).inner.clone() }
}

/// Destroy a ring buffer.
///
/// # Returns
/// * 0 once the ring is freed; the handle is invalid afterwards.
/// * FRB_ERROR_PRECONDITION while another call is still inside the ring.
///   The handle stays valid.
#[no_mangle]
pub extern "C" fn frb_ring_buffer_destroy(handle: *mut RingBufferHandle) -> c_int {
    if handle.is_null() {
        return FRB_ERROR_NULL_POINTER;
    }
    // SAFETY: non-null and produced by `frb_ring_buffer_new`.
    let in_use = unsafe { Arc::strong_count(&(*handle).inner) } > 1;
    if in_use {
        tracing::warn!("FFI: ring buffer destroyed while a call is in progress");
        return FRB_ERROR_PRECONDITION;
    }

    let handle = unsafe { Box::from_raw(handle) };
    match RingBuffer::destroy_shared(handle.inner) {
        Ok(_) => FRB_SUCCESS,
        Err(e) => error_code(&e),
    }
}

/// Write `len` bytes, fragmenting as needed and blocking while the ring is full.
///
/// # Returns
/// * Number of bytes written (always `len`) on success.
/// * Negative error code otherwise.
#[no_mangle]
pub extern "C" fn frb_ring_buffer_write(
    handle: *mut RingBufferHandle,
    data: *const u8,
    len: size_t,
) -> ssize_t {
    if handle.is_null() || (data.is_null() && len > 0) {
        return FRB_ERROR_NULL_POINTER as ssize_t;
    }

    let ring = ring_of(handle);
    let slice: &[u8] = if len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(data, len) }
    };

    match ring.write(slice) {
        Ok(written) => written as ssize_t,
        Err(e) => error_code(&e) as ssize_t,
    }
}

/// Write the whole buffer. Same contract as `frb_ring_buffer_write`, which
/// never returns short of an error.
#[no_mangle]
pub extern "C" fn frb_ring_buffer_write_full(
    handle: *mut RingBufferHandle,
    data: *const u8,
    len: size_t,
) -> c_int {
    match frb_ring_buffer_write(handle, data, len) {
        n if n < 0 => n as c_int,
        _ => FRB_SUCCESS,
    }
}

/// Block until a fragment is available.
///
/// # Returns
/// * 0 when data is available.
/// * FRB_ERROR_CLOSED once the ring is closed and drained.
#[no_mangle]
pub extern "C" fn frb_ring_buffer_wait_for_data(handle: *mut RingBufferHandle) -> c_int {
    if handle.is_null() {
        return FRB_ERROR_NULL_POINTER;
    }
    let ring = ring_of(handle);
    match ring.wait_for_data() {
        Ok(()) => FRB_SUCCESS,
        Err(e) => error_code(&e),
    }
}

/// Copy the oldest fragment into `out` and advance the read index.
///
/// # Returns
/// * 0 on success.
/// * FRB_ERROR_EMPTY if no fragment is published.
#[no_mangle]
pub extern "C" fn frb_ring_buffer_read_fragment(
    handle: *mut RingBufferHandle,
    out: *mut FrbFragment,
) -> c_int {
    if handle.is_null() || out.is_null() {
        return FRB_ERROR_NULL_POINTER;
    }
    let ring = ring_of(handle);

    let Some(slot) = ring.peek_read_slot() else {
        return FRB_ERROR_EMPTY;
    };

    let mut fragment = FrbFragment {
        total_length: slot.total_length(),
        fragment_offset: slot.fragment_offset(),
        len: slot.fragment_len(),
        data: [0; MAX_FRAGMENT_SIZE],
    };
    fragment.data[..fragment.len].copy_from_slice(slot.payload());
    slot.advance_read_index();

    unsafe { ptr::write(out, fragment) };
    FRB_SUCCESS
}

/// Close the ring, waking every blocked reader and writer.
#[no_mangle]
pub extern "C" fn frb_ring_buffer_close(handle: *mut RingBufferHandle) -> c_int {
    if handle.is_null() {
        return FRB_ERROR_NULL_POINTER;
    }
    ring_of(handle).close();
    FRB_SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroy_refuses_while_a_call_holds_the_ring() {
        let handle = frb_ring_buffer_new(4);
        assert!(!handle.is_null());

        // Stands in for a write or wait still running on another thread.
        let in_flight = ring_of(handle);
        assert_eq!(frb_ring_buffer_destroy(handle), FRB_ERROR_PRECONDITION);

        // The handle survived the refused destroy.
        assert_eq!(frb_ring_buffer_write(handle, b"ok".as_ptr(), 2), 2);
        assert_eq!(frb_ring_buffer_close(handle), FRB_SUCCESS);
        assert!(in_flight.is_closed());

        drop(in_flight);
        assert_eq!(frb_ring_buffer_destroy(handle), FRB_SUCCESS);
    }
}
