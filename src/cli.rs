use crate::models::{ConfigUpdate, MAX_COUNT, MIN_COUNT, Theme};
use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeArg {
    Light,
    Dark,
    System,
}

impl From<ThemeArg> for Theme {
    fn from(theme: ThemeArg) -> Self {
        match theme {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::System => Theme::System,
        }
    }
}

/// Generate batches of random (v4) UUIDs.
///
/// Flags are remembered: whatever differs from the defaults is saved and restored on
/// the next run unless `--no-save` is given.
#[derive(Debug, Clone, Parser)]
#[command(name = "uuidgen", version, about)]
pub struct Cli {
    /// Number of identifiers to generate (1-1000)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(MIN_COUNT as i64..=MAX_COUNT as i64))]
    pub count: Option<u32>,

    /// Uppercase hex digits
    #[arg(short = 'u', long)]
    pub upper: bool,

    /// Lowercase hex digits (undoes a saved --upper)
    #[arg(long, conflicts_with = "upper")]
    pub lower: bool,

    /// Strip hyphens
    #[arg(long)]
    pub no_hyphens: bool,

    /// Keep hyphens (undoes a saved --no-hyphens)
    #[arg(long, conflicts_with = "no_hyphens")]
    pub hyphens: bool,

    /// Wrap each identifier in braces
    #[arg(short = 'b', long)]
    pub braces: bool,

    /// No braces (undoes a saved --braces)
    #[arg(long, conflicts_with = "braces")]
    pub no_braces: bool,

    /// Wrap each identifier in double quotes
    #[arg(short = 'q', long)]
    pub quotes: bool,

    /// No quotes (undoes a saved --quotes)
    #[arg(long, conflicts_with = "quotes")]
    pub no_quotes: bool,

    /// Join identifiers with ", " instead of newlines
    #[arg(short = 'c', long)]
    pub commas: bool,

    /// Join identifiers with newlines (undoes a saved --commas)
    #[arg(long, conflicts_with = "commas")]
    pub no_commas: bool,

    /// Preferred colour theme, stored with the preferences
    #[arg(long, value_enum)]
    pub theme: Option<ThemeArg>,

    /// Copy the output to the clipboard
    #[arg(long)]
    pub copy: bool,

    /// Forget saved preferences before generating
    #[arg(long)]
    pub reset: bool,

    /// Data directory holding settings, preferences and logs
    #[arg(long, default_value = ".uuidgen")]
    pub data_dir: Utf8PathBuf,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Do not persist this run's preferences
    #[arg(long)]
    pub no_save: bool,
}

impl Cli {
    /// The flags as one partial configuration change.
    ///
    /// Each format setting has a pair of switches; an absent pair leaves the saved value
    /// alone.
    pub fn config_update(&self) -> ConfigUpdate {
        let mut update = ConfigUpdate::default();

        if let Some(count) = self.count {
            update = update.with_count(count);
        }
        if let Some(upper) = switch(self.upper, self.lower) {
            update = update.with_upper_case(upper);
        }
        if let Some(hyphens) = switch(self.hyphens, self.no_hyphens) {
            update = update.with_hyphens(hyphens);
        }
        if let Some(braces) = switch(self.braces, self.no_braces) {
            update = update.with_braces(braces);
        }
        if let Some(quotes) = switch(self.quotes, self.no_quotes) {
            update = update.with_quotes(quotes);
        }
        if let Some(commas) = switch(self.commas, self.no_commas) {
            update = update.with_commas(commas);
        }
        if let Some(theme) = self.theme {
            update = update.with_theme(theme.into());
        }

        update
    }
}

/// Resolve an on/off switch pair; clap rejects both being set.
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}
