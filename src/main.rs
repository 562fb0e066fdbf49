/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Main executable for gpaw-rs

use clap::Parser;
use gpaw_rs::cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    // Default to info-level logging so the generator tables show up
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Dataset(args) => gpaw_rs::cli::run_dataset(args),
        Command::Symmetry(args) => gpaw_rs::cli::run_symmetry(args),
    }
}
