//! The simplest useful agent: it parrots back the labels of whatever it last
//! observed. Handy as a sanity baseline and as the stand-in model in tests.

use crate::core::agents::{Agent, AgentError, SharedState};
use crate::core::message::Message;
use crate::core::opt::Opt;
use crate::core::registry::{AgentRegistry, ModelEntry};

pub const REPEAT_LABEL_KIND: &str =
    "colloquy.agents.repeat_label.repeat_label:RepeatLabelAgent";

pub struct RepeatLabelAgent {
    id: String,
    opt: Opt,
    observation: Option<Message>,
}

impl RepeatLabelAgent {
    pub fn new(opt: Opt) -> Self {
        Self {
            id: "repeat_label".to_owned(),
            opt,
            observation: None,
        }
    }

    /// No persisted form and no version: this agent is pure behavior.
    pub fn entry() -> ModelEntry {
        ModelEntry {
            factory: Self::create,
            from_shared: Self::create_from_shared,
            version: None,
            loadable: false,
        }
    }

    fn create(_registry: &AgentRegistry, opt: Opt) -> Result<Box<dyn Agent>, AgentError> {
        Ok(Box::new(Self::new(opt)))
    }

    fn create_from_shared(
        _registry: &AgentRegistry,
        shared: SharedState,
    ) -> Result<Box<dyn Agent>, AgentError> {
        Ok(Box::new(Self::new(shared.opt().clone())))
    }
}

impl Agent for RepeatLabelAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn observe(&mut self, observation: Message) -> Message {
        self.observation = Some(observation.clone());
        observation
    }

    fn act(&mut self) -> Message {
        let labels = self
            .observation
            .as_ref()
            .and_then(|observation| observation.labels.clone())
            .unwrap_or_default();
        let text = if labels.is_empty() {
            "Nothing to repeat yet.".to_owned()
        } else {
            labels.join(", ")
        };
        Message::text(text).with_id(self.id.clone())
    }

    fn reset(&mut self) {
        self.observation = None;
    }

    fn share(&self) -> SharedState {
        SharedState::new(REPEAT_LABEL_KIND, self.opt.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeats_observed_labels() {
        let mut agent = RepeatLabelAgent::new(Opt::new());
        agent.observe(Message::text("1+1?").with_labels(vec!["two".to_owned()]));
        let reply = agent.act();
        assert_eq!(reply.text.as_deref(), Some("two"));
        assert_eq!(reply.id.as_deref(), Some("repeat_label"));
    }

    #[test]
    fn test_act_without_observation() {
        let mut agent = RepeatLabelAgent::new(Opt::new());
        assert_eq!(agent.act().text.as_deref(), Some("Nothing to repeat yet."));
    }

    #[test]
    fn test_reset_forgets_the_observation() {
        let mut agent = RepeatLabelAgent::new(Opt::new());
        agent.observe(Message::text("q").with_labels(vec!["a".to_owned()]));
        agent.reset();
        assert_eq!(agent.act().text.as_deref(), Some("Nothing to repeat yet."));
    }
}
