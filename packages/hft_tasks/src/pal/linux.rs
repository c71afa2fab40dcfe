mod abstractions;
mod facade;
mod real;

use std::{io, mem};

pub(crate) use abstractions::*;
pub(crate) use facade::*;
use libc::cpu_set_t;
pub(crate) use real::*;

/// `nice` value with the highest scheduling weight the kernel allows.
pub(crate) const STRONGEST_NICE: i32 = -20;

/// Creates a processor set that contains only the processor with the given index.
pub(crate) fn single_processor_set(processor_index: usize) -> Result<cpu_set_t, io::Error> {
    let capacity = usize::try_from(libc::CPU_SETSIZE).expect("CPU_SETSIZE is a positive constant");

    if processor_index >= capacity {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "processor index {processor_index} exceeds the {capacity} processors a cpu_set_t can hold"
            ),
        ));
    }

    // SAFETY: All zeroes is a valid (empty) cpu_set_t.
    let mut cpuset: cpu_set_t = unsafe { mem::zeroed() };

    // SAFETY: The index was checked against the capacity of the set above.
    unsafe {
        libc::CPU_SET(processor_index, &mut cpuset);
    }

    Ok(cpuset)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn single_processor_set_contains_only_that_processor() {
        let cpuset = single_processor_set(3).unwrap();

        // SAFETY: Indices are within the set's capacity.
        unsafe {
            assert!(libc::CPU_ISSET(3, &cpuset));
            assert!(!libc::CPU_ISSET(2, &cpuset));
            assert_eq!(libc::CPU_COUNT(&cpuset), 1);
        }
    }

    #[test]
    fn single_processor_set_rejects_out_of_range_index() {
        let error = single_processor_set(100_000).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidInput);
    }
}
