// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Test harness for hardware video decoders: decodes a picture, moves images to and from the
//! decoder surface and writes the result out.

pub mod bitstream;
pub mod buffer;
pub mod cmdline;
pub mod codec;
pub mod config;
pub mod decoder;
pub mod error;
pub mod harness;

pub use error::Error;
pub use error::Result;
