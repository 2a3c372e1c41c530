//! CLI argument parsing for mp

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mp")]
#[command(author, version, about = "Media progress examples on a wide-column store", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// SQLite store file (overrides config)
    #[arg(long, global = true, conflicts_with = "memory")]
    pub store: Option<PathBuf>,

    /// Use a throwaway in-memory store
    #[arg(long, global = true)]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Insert examples
    Insert {
        #[command(subcommand)]
        example: InsertExample,
    },

    /// Read examples
    Read {
        #[command(subcommand)]
        example: ReadExample,
    },

    /// Delete example
    Delete,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertExample {
    /// Insert a single record
    One,

    /// Insert twice with the stale-write guard
    Conditional,

    /// Insert five records in one bulk call
    Batch,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadExample {
    /// Read a single record
    One,

    /// Read two media items of one title
    Multiple,

    /// Read every media item of one title
    #[command(name = "partial-key", alias = "partialKey")]
    PartialKey,
}
