// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod framing;
pub mod item;
pub mod protocol;
pub mod transport;
pub mod types;
pub mod worker;
