//! Message protocol definitions
//!
//! Typed events on both sides of the wire. Inbound lines are decoded once
//! into the `ClientMessage` tagged enum at the codec boundary; the
//! dispatcher matches it exhaustively instead of re-inspecting verb
//! strings. Outbound `ServerMessage` values render to the fixed line
//! grammar via `Display`.

use crate::error::ParseError;

/// Client → Server event, decoded from one wire line
///
/// A line is a command iff it begins with `/` and its second character (if
/// any) is not also `/`. Everything else is chat text; a leading `//`
/// escapes a literal message starting with a slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// `/nick <name>`: set or change nickname
    Nick { name: String },
    /// `/join <room>`: leave the current room (if any) and join `<room>`
    Join { room: String },
    /// `/leave`: leave the current room
    Leave,
    /// `/bye`: graceful disconnect
    Bye,
    /// `/priv <name> <text...>`: directed message, bypasses rooms
    Priv { to: String, text: String },
    /// Plain chat text, broadcast to the current room
    Chat { text: String },
}

impl ClientMessage {
    /// Decode one line into a typed event.
    ///
    /// Commands are tokenized on single spaces; `/priv` rejoins the
    /// remaining tokens with single spaces. Unknown verbs and wrong
    /// argument counts are reported for an `ERROR` reply.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        if let Some(escaped) = line.strip_prefix("//") {
            return Ok(ClientMessage::Chat {
                text: format!("/{}", escaped),
            });
        }

        let Some(command) = line.strip_prefix('/') else {
            return Ok(ClientMessage::Chat {
                text: line.to_string(),
            });
        };

        let mut tokens = command.split(' ');
        let verb = tokens.next().unwrap_or("");
        match verb {
            "nick" => {
                let name = Self::single_argument("nick", &mut tokens)?;
                Ok(ClientMessage::Nick { name })
            }
            "join" => {
                let room = Self::single_argument("join", &mut tokens)?;
                Ok(ClientMessage::Join { room })
            }
            "leave" => {
                Self::no_arguments("leave", &mut tokens)?;
                Ok(ClientMessage::Leave)
            }
            "bye" => {
                Self::no_arguments("bye", &mut tokens)?;
                Ok(ClientMessage::Bye)
            }
            "priv" => {
                let to = tokens
                    .next()
                    .filter(|t| !t.is_empty())
                    .ok_or(ParseError::MissingArgument("priv"))?
                    .to_string();
                let text = tokens.collect::<Vec<_>>().join(" ");
                if text.is_empty() {
                    return Err(ParseError::MissingArgument("priv"));
                }
                Ok(ClientMessage::Priv { to, text })
            }
            other => Err(ParseError::UnknownCommand(other.to_string())),
        }
    }

    fn single_argument<'a>(
        verb: &'static str,
        tokens: &mut impl Iterator<Item = &'a str>,
    ) -> Result<String, ParseError> {
        let arg = tokens
            .next()
            .filter(|t| !t.is_empty())
            .ok_or(ParseError::MissingArgument(verb))?;
        if tokens.next().is_some() {
            return Err(ParseError::TooManyArguments(verb));
        }
        Ok(arg.to_string())
    }

    fn no_arguments<'a>(
        verb: &'static str,
        tokens: &mut impl Iterator<Item = &'a str>,
    ) -> Result<(), ParseError> {
        if tokens.next().is_some() {
            return Err(ParseError::TooManyArguments(verb));
        }
        Ok(())
    }
}

/// Server → Client message
///
/// Immutable once constructed; each value renders as exactly one wire line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Last command succeeded
    Ok,
    /// Last command failed
    Error,
    /// Chat line from another user (room broadcast or private)
    Chat { from: String, text: String },
    /// A user joined your room
    Joined { user: String },
    /// A user left your room
    Left { user: String },
    /// A room member changed nickname
    NewNick { old: String, new: String },
    /// Acknowledgment of a graceful disconnect; the socket closes after
    Bye,
}

impl std::fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerMessage::Ok => write!(f, "OK"),
            ServerMessage::Error => write!(f, "ERROR"),
            ServerMessage::Chat { from, text } => write!(f, "MESSAGE {} {}", from, text),
            ServerMessage::Joined { user } => write!(f, "JOINED {}", user),
            ServerMessage::Left { user } => write!(f, "LEFT {}", user),
            ServerMessage::NewNick { old, new } => write!(f, "NEWNICK {} {}", old, new),
            ServerMessage::Bye => write!(f, "BYE"),
        }
    }
}
