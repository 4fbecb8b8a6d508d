//! Device tokens for sharing GPUs between parallel trials

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, PoisonError};

use crate::optim::hpo::error::{HPOError, Result};

/// How trials are spread over the visible devices.
#[derive(Debug, Clone, PartialEq)]
pub struct DevicePlan {
    /// Device ids as given in `gpus`
    pub device_ids: Vec<String>,
    /// Effective share of one device per trial
    pub gpu_fraction: f64,
    /// Concurrent trials allowed on each device
    pub processes_per_device: usize,
}

impl DevicePlan {
    /// Plan for `gpus` (comma separated ids) shared by `num_workers` workers.
    ///
    /// With fewer devices than workers the achievable share is
    /// `max(devices / workers - epsilon, epsilon)`. A requested `gpu_fraction`
    /// above that share is lowered to it, or raised to a whole device when the
    /// share exceeds one half.
    pub fn new(gpus: &str, num_workers: usize, epsilon: f64, gpu_fraction: f64) -> Result<Self> {
        let device_ids: Vec<String> = gpus
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect();
        if device_ids.is_empty() {
            return Err(HPOError::InvalidConfig(format!("no device ids in gpus '{gpus}'")));
        }
        if !(gpu_fraction > 0.0 && gpu_fraction <= 1.0) {
            return Err(HPOError::InvalidConfig(format!(
                "gpu_fraction must be in (0, 1], got {gpu_fraction}"
            )));
        }

        let total = device_ids.len();
        let mut gpu_fraction = gpu_fraction;
        if total < num_workers {
            let fraction = (total as f64 / num_workers as f64 - epsilon).max(epsilon);
            if fraction < gpu_fraction {
                if fraction > 0.5 {
                    if (gpu_fraction - 1.0).abs() > f64::EPSILON {
                        log::warn!(
                            "Setting gpu_fraction to 1 as the devices would be underutilized by the parallel workers"
                        );
                    }
                    gpu_fraction = 1.0;
                } else {
                    log::warn!(
                        "Setting gpu_fraction to {fraction} as {total} devices are available for {num_workers} workers"
                    );
                    gpu_fraction = fraction;
                }
            } else {
                log::warn!(
                    "gpu_fraction could be increased to {fraction} as {total} devices are available for {num_workers} workers"
                );
            }
        }

        let processes_per_device = ((1.0 / gpu_fraction).floor() as usize).max(1);
        Ok(Self {
            device_ids,
            gpu_fraction,
            processes_per_device,
        })
    }

    /// Number of tokens the pool will hold
    pub fn total_tokens(&self) -> usize {
        self.device_ids.len() * self.processes_per_device
    }

    /// Pool holding every device id `processes_per_device` times
    pub fn token_pool(&self) -> TokenPool {
        TokenPool::new(self.device_ids.iter().flat_map(|id| {
            std::iter::repeat_n(id.clone(), self.processes_per_device)
        }))
    }
}

/// Blocking multiset of tokens.
///
/// A token leaves the pool on [`acquire`](TokenPool::acquire) and returns when
/// its guard is dropped, including during unwinding. A worker that aborts
/// without unwinding keeps its token.
#[derive(Debug, Default)]
pub struct TokenPool {
    tokens: Mutex<VecDeque<String>>,
    returned: Condvar,
}

impl TokenPool {
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            tokens: Mutex::new(tokens.into_iter().collect()),
            returned: Condvar::new(),
        }
    }

    /// Take a token, waiting until one is free
    pub fn acquire(&self) -> DeviceToken<'_> {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(device) = tokens.pop_front() {
                return DeviceToken { pool: self, device };
            }
            tokens = self.returned.wait(tokens).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Tokens currently free
    pub fn available(&self) -> usize {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn release(&self, device: String) {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(device);
        self.returned.notify_one();
    }
}

/// A reserved device; returned to its pool on drop.
#[derive(Debug)]
pub struct DeviceToken<'a> {
    pool: &'a TokenPool,
    device: String,
}

impl DeviceToken<'_> {
    /// Device id, suitable for `CUDA_VISIBLE_DEVICES`
    pub fn device(&self) -> &str {
        &self.device
    }
}

impl Drop for DeviceToken<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.device));
    }
}
