//! fpd-legacy - Fingerprint session engine for legacy sensor drivers
//!
//! This crate drives a legacy fingerprint driver (blocking calls plus an
//! asynchronous notification channel) on behalf of remote callers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Fingerprint                           │
//! │  sensor props, session creation, notification listener      │
//! │                                                              │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │                      Session                         │   │
//! │  │  ┌──────────────┐ ┌──────────────┐ ┌──────────────┐  │   │
//! │  │  │ StateMachine │ │ Cancellation │ │   Lockout    │  │   │
//! │  │  │ (scheduled/  │ │   Signal     │ │ Coordinator  │  │   │
//! │  │  │  current)    │ │  (one-shot)  │ │ (+ timer)    │  │   │
//! │  │  └──────────────┘ └──────────────┘ └──────────────┘  │   │
//! │  │          │  dispatch          notify │               │   │
//! │  │    ┌─────┴────────┐         ┌────────┴─────┐         │   │
//! │  │    │ WorkerThread │         │ VendorCodes  │         │   │
//! │  │    │ (FIFO, 1 job)│         │ (translator) │         │   │
//! │  │    └─────┬────────┘         └────────┬─────┘         │   │
//! │  └──────────┼───────────────────────────┼───────────────┘   │
//! │        ┌────┴───────────────────────────┴────┐              │
//! │        │          FingerprintDevice          │              │
//! │        │     (simulated / vendor driver)     │              │
//! │        └─────────────────────────────────────┘              │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod hal;
pub mod lockout;
pub mod session;
pub mod token;
pub mod vendor;
pub mod worker;

pub use config::HalConfig;
pub use device::{create_device, DeviceError, DeviceMessage, FingerId, FingerprintDevice};
pub use error::HalError;
pub use hal::Fingerprint;
pub use lockout::{FailedAttemptTracker, LockoutCoordinator};
pub use session::{CancellationSignal, Session, SessionContext, SessionState};
pub use token::LegacyAuthToken;
pub use vendor::VendorCodes;
pub use worker::WorkerThread;

// Re-export for convenience
pub use fpd_core::{
    AcquiredInfo, ChannelCallback, HardwareAuthToken, LockoutMode, LockoutTracker, SensorError,
    SensorProps, SessionCallback, SessionEvent,
};
