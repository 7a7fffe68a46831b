//! Supportive default replies
//!
//! Used when the risk model returns no reply of its own, and for the
//! degraded fallback path. The crisis reply always points at immediate
//! human help.

use rand::seq::SliceRandom;
use vigil_core::MessageRisk;

/// Reply shown on a crisis-guard hit or an emergency classification
pub const CRISIS_REPLY: &str = "I'm detecting that you might be in a crisis. I am an AI and \
     cannot provide the help you need right now. Please contact emergency services immediately \
     or call a suicide prevention hotline (like 988 in the US). Your life matters, and there \
     are people who want to help you.";

const LOW_RISK_REPLIES: &[&str] = &[
    "I hear you. Can you tell me more about that? I'm here to support you.",
    "Thanks for sharing that with me. How long have you been feeling this way?",
    "It's good that you're talking about it. What do you think would help right now?",
];

const ELEVATED_RISK_REPLIES: &[&str] = &[
    "It sounds like you're carrying a heavy load. You don't have to do it alone.",
    "I'm sorry you're going through such a hard time. Talking to a counselor could really help.",
    "You deserve support. There are people who want to help you through this.",
];

const DEGRADED_REPLIES: &[&str] = &[
    "I'm here to listen. Tell me more about how you're feeling.",
    "I'm having a little trouble on my end, but I'm still here with you. What's on your mind?",
];

/// Default reply for a classification the model left without one
pub fn default_reply(risk: MessageRisk) -> &'static str {
    let bank = match risk {
        MessageRisk::NoRisk | MessageRisk::Low | MessageRisk::Medium => LOW_RISK_REPLIES,
        MessageRisk::High => ELEVATED_RISK_REPLIES,
        MessageRisk::Emergency => return CRISIS_REPLY,
    };
    choose(bank)
}

/// Reply for the degraded fallback path
pub fn degraded_reply() -> &'static str {
    choose(DEGRADED_REPLIES)
}

fn choose(bank: &[&'static str]) -> &'static str {
    bank.choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(LOW_RISK_REPLIES[0])
}
