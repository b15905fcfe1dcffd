// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Runs the decode harness with the settings given on the command line.

use env_logger::Env;
use hwdecode::cmdline::Args;
use hwdecode::config::Config;
use hwdecode::decoder::DummyDecoder;
use hwdecode::harness;
use log::error;
use log::LevelFilter;

fn init_logging(debug: bool) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if debug {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn run_main(config: Config) -> anyhow::Result<()> {
    let mut decoder = DummyDecoder::new();
    harness::run(&config, &mut decoder, None)
}

fn main() {
    let args: Args = argh::from_env();
    let config = Config::from(args);
    init_logging(config.debug);
    if let Err(e) = run_main(config) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
