//! Message-bus contracts.
//!
//! A transport exposes inbound messages through [`MessageSubscriber`] and
//! accepts outbound messages through [`MessageSender`]. Modules and the
//! command engine only ever see these traits.

pub mod bus;
pub mod error;
pub mod filter;
pub mod hub;
pub mod phone;

pub use {
    bus::{
        CombinedMessageService, MessageReplier, MessageSender, MessageService, MessageSubscriber,
        new_reply, reply_message,
    },
    error::{Error, Result},
    filter::{MessageFilter, MessageFilters, filter_message},
    hub::MessageHub,
    parley_common::Message,
    phone::validate_phone_number,
};
