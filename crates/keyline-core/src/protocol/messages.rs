// ============================================
// File: crates/keyline-core/src/protocol/messages.rs
// ============================================
//! # Protocol Message Definitions
//!
//! ## Creation Reason
//! Defines the message type codes carried in the first cleartext field
//! and the result codes the account operations answer with.
//!
//! ## Message Types
//! | Code | Type | Direction |
//! |------|------|-----------|
//! | 0 | ERROR | both |
//! | 1 | KEY_SHARE | both (cleartext only) |
//! | 2 | CREATE | client ↔ server |
//! | 3 | LOGIN | client ↔ server |
//! | 4 | VERIFY | client ↔ server |
//! | 5 | UPDATE | client ↔ server |
//!
//! ## ⚠️ Important Note for Next Developer
//! - Codes are decimal on the wire
//! - Add new codes at the end; never renumber
//!
//! ## Last Modified
//! v0.1.0 - Initial message definitions

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================
// MessageType
// ============================================

/// Message type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    /// Error report; payload is an [`ErrorCode`].
    Error = 0,
    /// Key share; only meaningful in cleartext.
    KeyShare = 1,
    /// Account creation.
    Create = 2,
    /// Account login.
    Login = 3,
    /// Account verification.
    Verify = 4,
    /// Account update.
    Update = 5,
}

impl MessageType {
    /// Converts a wire code to a `MessageType`.
    ///
    /// Returns `None` for unknown codes.
    #[must_use]
    pub const fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Error),
            1 => Some(Self::KeyShare),
            2 => Some(Self::Create),
            3 => Some(Self::Login),
            4 => Some(Self::Verify),
            5 => Some(Self::Update),
            _ => None,
        }
    }

    /// Returns the wire code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "ERROR",
            Self::KeyShare => "KEY_SHARE",
            Self::Create => "CREATE",
            Self::Login => "LOGIN",
            Self::Verify => "VERIFY",
            Self::Update => "UPDATE",
        };
        f.write_str(name)
    }
}

// ============================================
// Result Codes
// ============================================

/// Declares a closed set of wire result codes.
macro_rules! result_codes {
    (
        $(#[$meta:meta])*
        $name:ident { $( $(#[$vmeta:meta])* $variant:ident = $code:literal => $label:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $code, )+
        }

        impl $name {
            /// Converts a wire code, returning `None` if unknown.
            #[must_use]
            pub const fn from_code(code: u64) -> Option<Self> {
                match code {
                    $( $code => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Returns the wire code.
            #[must_use]
            pub const fn code(self) -> u8 {
                self as u8
            }

            /// Parses a decimal wire code.
            #[must_use]
            pub fn parse(text: &str) -> Option<Self> {
                text.parse::<u64>().ok().and_then(Self::from_code)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $( Self::$variant => f.write_str($label), )+
                }
            }
        }
    };
}

result_codes! {
    /// Outcome of an account creation.
    CreateResult {
        /// Account created.
        Success = 0 => "SUCCESS",
        /// Username contains a disallowed character.
        UsernameChar = 1 => "UNAME_CHAR",
        /// Username length out of bounds.
        UsernameLength = 2 => "UNAME_LENGTH",
        /// Password contains a disallowed character.
        PasswordChar = 3 => "PASS_CHAR",
        /// Password length out of bounds.
        PasswordLength = 4 => "PASS_LENGTH",
        /// Username already registered.
        UsernameTaken = 5 => "UNAME_TAKEN",
    }
}

result_codes! {
    /// Outcome of a login.
    LoginResult {
        /// Logged in.
        Success = 0 => "SUCCESS",
        /// Wrong password.
        BadPassword = 1 => "BAD_PASS",
        /// No such user.
        NoUser = 2 => "NO_USER",
        /// Account exists but has not been verified.
        Verify = 3 => "VERIFY",
    }
}

result_codes! {
    /// Outcome of an account verification.
    VerifyResult {
        /// Account verified.
        Success = 0 => "SUCCESS",
        /// Verification key did not match.
        BadKey = 1 => "BAD_KEY",
        /// No such user.
        NoUser = 2 => "NO_USER",
        /// Must be logged in first.
        Login = 3 => "LOGIN",
    }
}

result_codes! {
    /// Outcome of an account update.
    UpdateResult {
        /// Account updated.
        Success = 0 => "SUCCESS",
        /// Must be logged in first.
        Login = 1 => "LOGIN",
        /// Account must be verified first.
        Verify = 2 => "VERIFY",
        /// No such user.
        NoUser = 3 => "NO_USER",
    }
}

result_codes! {
    /// Code carried by an ERROR message.
    ErrorCode {
        /// Account store failure.
        Database = 0 => "DATABASE",
        /// Peer could not decrypt our frame.
        Decrypt = 1 => "DECRYPT",
        /// Request was not understood.
        BadRequest = 2 => "BAD_REQ",
        /// Peer has no key yet.
        NoKey = 3 => "NO_KEY",
    }
}

// ============================================
// Tests
// ============================================
