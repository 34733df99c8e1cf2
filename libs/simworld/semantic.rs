//! Semantic events
//!
//! A pure transformation stage between the dispatcher and presentation:
//! [`expand`] turns one decoded wire event into zero or more higher-level
//! events (agent roster changes, timed speech bubbles, dialogue feed lines,
//! weather). Timing is carried as data; delivery is immediate and the
//! consumer schedules the display.

use crate::events::{Agent, AgentDialogue, AgentId, WireEvent};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Number of lines kept by a [`DialogueLog`] by default
pub const DIALOGUE_LOG_CAPACITY: usize = 10;

/// Prefix put in front of thought bubbles
pub const THOUGHT_PREFIX: &str = "💭 ";

/// Lines that are agent bookkeeping rather than speech
const BLOCKED_PREFIXES: [&str; 6] = [
    "цель:",
    "действие:",
    "настроение:",
    "goal:",
    "action:",
    "mood:",
];

/// Display timing for speech bubbles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BubbleTiming {
    /// How long a thought bubble stays up
    pub thought: Duration,
    /// How long each dialogue bubble stays up
    pub dialogue: Duration,
    /// Delay before the second speaker's bubble appears
    pub reply_delay: Duration,
}

impl Default for BubbleTiming {
    fn default() -> Self {
        Self {
            thought: Duration::from_millis(7000),
            dialogue: Duration::from_millis(6000),
            reply_delay: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weather {
    Sunny,
    Rainy,
    Cloudy,
    Snowy,
    Foggy,
    Stormy,
}

impl Weather {
    /// Case-insensitive parse; anything unrecognised is sunny
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "rainy" => Weather::Rainy,
            "cloudy" => Weather::Cloudy,
            "snowy" => Weather::Snowy,
            "foggy" => Weather::Foggy,
            "stormy" => Weather::Stormy,
            _ => Weather::Sunny,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Weather::Sunny => "sunny",
            Weather::Rainy => "rainy",
            Weather::Cloudy => "cloudy",
            Weather::Snowy => "snowy",
            Weather::Foggy => "foggy",
            Weather::Stormy => "stormy",
        }
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timed speech bubble above an agent
#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub agent_id: AgentId,
    pub text: String,
    /// Wait this long before showing the bubble
    pub delay: Duration,
    /// Keep the bubble up this long once shown
    pub duration: Duration,
}

/// One line of the live dialogue feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueLine {
    pub speaker: String,
    pub target: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SemanticEvent {
    /// Full roster replacement
    AgentsReplaced(Vec<Agent>),
    AgentAdded(Agent),
    AgentRemoved { agent_id: AgentId },
    AgentPositioned { agent_id: AgentId, x: f64, y: f64 },
    MoodChanged { agent_id: AgentId, mood: String },
    Bubble(Bubble),
    DialogueLine(DialogueLine),
    WeatherChanged(Weather),
}

/// Expand one wire event into semantic events
///
/// Kinds without a semantic counterpart expand to nothing.
pub fn expand(event: &WireEvent, timing: &BubbleTiming) -> Vec<SemanticEvent> {
    match event {
        WireEvent::AgentsUpdate(update) => vec![SemanticEvent::AgentsReplaced(update.agents.clone())],
        WireEvent::AgentCreated(agent) => vec![SemanticEvent::AgentAdded(agent.clone())],
        WireEvent::AgentDeleted(deleted) => vec![SemanticEvent::AgentRemoved {
            agent_id: deleted.agent_id,
        }],
        WireEvent::AgentMoved(moved) => vec![SemanticEvent::AgentPositioned {
            agent_id: moved.agent_id,
            x: moved.x,
            y: moved.y,
        }],
        WireEvent::AgentMoodChanged(changed) => vec![SemanticEvent::MoodChanged {
            agent_id: changed.agent_id,
            mood: changed.mood.clone(),
        }],
        WireEvent::AgentThought(thought) => vec![SemanticEvent::Bubble(Bubble {
            agent_id: thought.agent_id,
            text: format!("{}{}", THOUGHT_PREFIX, thought.thought),
            delay: Duration::ZERO,
            duration: timing.thought,
        })],
        WireEvent::AgentDialogue(dialogue) => expand_dialogue(dialogue, timing),
        WireEvent::WeatherChanged(env) | WireEvent::EnvironmentUpdate(env) => {
            vec![SemanticEvent::WeatherChanged(Weather::normalize(&env.weather))]
        }
        _ => Vec::new(),
    }
}

fn expand_dialogue(dialogue: &AgentDialogue, timing: &BubbleTiming) -> Vec<SemanticEvent> {
    let mut events = Vec::new();
    let speakers = [
        (dialogue.agent_id1, &dialogue.name1, &dialogue.name2, Duration::ZERO),
        (dialogue.agent_id2, &dialogue.name2, &dialogue.name1, timing.reply_delay),
    ];

    for (message, (agent_id, speaker, target, delay)) in dialogue.messages.iter().zip(speakers) {
        events.push(SemanticEvent::Bubble(Bubble {
            agent_id,
            text: message.text.clone(),
            delay,
            duration: timing.dialogue,
        }));

        if let Some(text) = normalize_dialogue_text(&message.text) {
            events.push(SemanticEvent::DialogueLine(DialogueLine {
                speaker: speaker.clone(),
                target: target.clone(),
                text,
            }));
        }
    }

    events
}

/// Clean a dialogue line for the feed
///
/// Returns `None` for empty text and for bookkeeping lines such as
/// `goal: ...`.
pub fn normalize_dialogue_text(raw: &str) -> Option<String> {
    let text = raw.replace('*', "");
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let lower = text.to_lowercase();
    if BLOCKED_PREFIXES.iter().any(|prefix| lower.starts_with(prefix)) {
        return None;
    }

    if text.ends_with(&['.', '!', '?'][..]) {
        Some(text.to_string())
    } else {
        Some(format!("{}.", text))
    }
}

/// Bounded dialogue feed, newest line first
#[derive(Debug, Clone)]
pub struct DialogueLog {
    lines: VecDeque<DialogueLine>,
    capacity: usize,
}

impl Default for DialogueLog {
    fn default() -> Self {
        Self::with_capacity(DIALOGUE_LOG_CAPACITY)
    }
}

impl DialogueLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a line, evicting the oldest when full
    pub fn push(&mut self, line: DialogueLine) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_back();
        }
        self.lines.push_front(line);
    }

    /// Record every dialogue line among `events`
    pub fn extend_from(&mut self, events: &[SemanticEvent]) {
        for event in events {
            if let SemanticEvent::DialogueLine(line) = event {
                self.push(line.clone());
            }
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &DialogueLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
