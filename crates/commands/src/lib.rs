//! Command matching and dispatch for free-text messages.
//!
//! A [`Command`] pairs a [`Prefix`] with an [`Action`]. Commands nest through
//! [`subcommands`], so a message like `"Discord, send alice hi"` descends one
//! word at a time until some leaf action runs. Messages that no command
//! claims produce [`CommandError::NotMatched`].

pub mod command;
pub mod dispatch;
pub mod error;
pub mod prefix;

pub use {
    command::{Action, Command, CommandMessage, Subcommands, subcommands},
    dispatch::{DispatchLimit, NOT_MATCHED_REPLY, error_message, fan_out},
    error::{CommandError, NotMatched, Result},
    prefix::{Prefix, pop_first_word},
};
