//! # VSM Bus Test Suite
//!
//! Unified test crate for cross-module delivery scenarios.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── causal_ordering.rs   # Ordered vs unordered delivery contracts
//!     ├── algedonic.rs         # Bypass-path scenarios
//!     ├── lifecycle.rs         # Subscriber death, unsubscribe, shutdown,
//!     │                        # clock degradation
//!     └── backpressure.rs      # Non-blocking publish, buffer bounds
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p vsm-tests
//! cargo test -p vsm-tests integration::causal_ordering::
//! ```

#![allow(dead_code)]
