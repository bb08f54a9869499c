// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of Catalog Vault.
//
// Catalog Vault is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// Catalog Vault is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with Catalog Vault. If not, see <https://www.gnu.org/licenses/>.

//! Catalog Vault CLI Tool
//!
//! ## Purpose
//! Inspect and maintain persisted projects against the configured backends:
//! - `list` - project summaries, newest first
//! - `show` - one project with its image mapping
//! - `delete` - remove a project and all of its blobs
//! - `export-spreadsheet` - download the stored source spreadsheet
//! - `smoke-test` - save, load and delete a throwaway project
//!
//! Backends come from `CATALOGVAULT_*` environment variables.

use anyhow::{Context, Result};
use catalogvault_project::ProjectStore;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod project;
mod smoke;

#[derive(Parser)]
#[command(name = "catalogvault")]
#[command(about = "Catalog Vault CLI - Inspect and maintain stored projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List project summaries
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one project
    Show {
        /// Project ID
        id: String,

        /// Include every product in the output
        #[arg(long)]
        products: bool,
    },

    /// Delete a project, its document and every blob under its prefix
    Delete {
        /// Project ID
        id: String,
    },

    /// Download the stored source spreadsheet
    ExportSpreadsheet {
        /// Project ID
        id: String,

        /// Output file (defaults to the stored filename)
        out: Option<PathBuf>,
    },

    /// Save, load and delete a throwaway project
    SmokeTest,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let store = ProjectStore::from_env()
        .await
        .context("Failed to configure project store")?;

    match cli.command {
        Commands::List { json } => project::list(&store, json).await,
        Commands::Show { id, products } => project::show(&store, &id, products).await,
        Commands::Delete { id } => project::delete(&store, &id).await,
        Commands::ExportSpreadsheet { id, out } => {
            project::export_spreadsheet(&store, &id, out.as_deref()).await
        }
        Commands::SmokeTest => smoke::run(&store).await,
    }
}
