//! Shared clap helper types for CLI commands.

use clap::ValueEnum;
use greetcard::{Alignment, CollisionPolicy, Direction, FailurePolicy};

/// Horizontal alignment flag for text regions.
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum AlignArg {
    Left,
    Center,
    Right,
}

impl From<AlignArg> for Alignment {
    fn from(value: AlignArg) -> Alignment {
        match value {
            AlignArg::Left => Alignment::Left,
            AlignArg::Center => Alignment::Center,
            AlignArg::Right => Alignment::Right,
        }
    }
}

/// Writing direction flag for text regions.
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DirectionArg {
    Ltr,
    Rtl,
}

impl From<DirectionArg> for Direction {
    fn from(value: DirectionArg) -> Direction {
        match value {
            DirectionArg::Ltr => Direction::Ltr,
            DirectionArg::Rtl => Direction::Rtl,
        }
    }
}

/// Bulk behaviour when a single name fails.
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OnErrorArg {
    Abort,
    Skip,
}

impl From<OnErrorArg> for FailurePolicy {
    fn from(value: OnErrorArg) -> FailurePolicy {
        match value {
            OnErrorArg::Abort => FailurePolicy::Abort,
            OnErrorArg::Skip => FailurePolicy::Skip,
        }
    }
}

/// Bulk behaviour when two names map to the same archive entry.
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum CollisionArg {
    Suffix,
    Overwrite,
}

impl From<CollisionArg> for CollisionPolicy {
    fn from(value: CollisionArg) -> CollisionPolicy {
        match value {
            CollisionArg::Suffix => CollisionPolicy::Suffix,
            CollisionArg::Overwrite => CollisionPolicy::Overwrite,
        }
    }
}
