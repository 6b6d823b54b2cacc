use crate::types::{Challenge, EventKind, KnowledgeNode, MoveOutcome, Reward};

/// What the presentation layer should do with a confirmed move.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Continue,
    OpenKnowledge(KnowledgeNode),
    OpenChallenge(Challenge),
    ShowReward(Reward),
    Complete,
}

impl Action {
    /// Knowledge and challenge modals block play; rewards and completion do not.
    pub fn blocks_play(&self) -> bool {
        matches!(self, Action::OpenKnowledge(_) | Action::OpenChallenge(_))
    }
}

/// Routes a server move outcome to a declarative action.
///
/// An absent or unrecognized event maps to `Continue`; a goal event after the
/// session already completed is ignored. An event that arrives without its
/// payload is treated as malformed and play continues.
pub fn dispatch(outcome: &MoveOutcome, already_completed: bool) -> Action {
    match outcome.event_type.unwrap_or(EventKind::None) {
        EventKind::None => Action::Continue,
        EventKind::Knowledge => match &outcome.knowledge_node {
            Some(node) => Action::OpenKnowledge(node.clone()),
            None => Action::Continue,
        },
        EventKind::Challenge => match &outcome.challenge {
            Some(challenge) => Action::OpenChallenge(challenge.clone()),
            None => Action::Continue,
        },
        EventKind::Reward => match &outcome.reward {
            Some(reward) => Action::ShowReward(reward.clone()),
            None => Action::Continue,
        },
        EventKind::Goal => {
            if already_completed {
                Action::Continue
            } else {
                Action::Complete
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MazeProgress, Position};
    use chrono::Utc;

    fn accepted(event_type: EventKind) -> MoveOutcome {
        MoveOutcome::accepted(
            event_type,
            MazeProgress::new("u1", "m1", Position { x: 1, y: 1 }, Utc::now()),
        )
    }

    #[test]
    fn plain_move_continues() {
        assert_eq!(dispatch(&accepted(EventKind::None), false), Action::Continue);
    }

    #[test]
    fn missing_event_type_continues() {
        let mut outcome = accepted(EventKind::None);
        outcome.event_type = None;
        assert_eq!(dispatch(&outcome, false), Action::Continue);
    }

    #[test]
    fn knowledge_event_opens_the_knowledge_modal() {
        let mut outcome = accepted(EventKind::Knowledge);
        let node = KnowledgeNode {
            id: "k1".to_string(),
            title: "Hydration".to_string(),
            content: "Drink water through the day.".to_string(),
        };
        outcome.knowledge_node = Some(node.clone());
        let action = dispatch(&outcome, false);
        assert_eq!(action, Action::OpenKnowledge(node));
        assert!(action.blocks_play());
    }

    #[test]
    fn challenge_event_opens_the_challenge_modal() {
        let mut outcome = accepted(EventKind::Challenge);
        let challenge = Challenge {
            id: "c1".to_string(),
            question: "How many hours of sleep do adults need?".to_string(),
            options: vec!["4-5".to_string(), "7-9".to_string()],
            answer_index: 1,
        };
        outcome.challenge = Some(challenge.clone());
        let action = dispatch(&outcome, false);
        assert_eq!(action, Action::OpenChallenge(challenge));
        assert!(action.blocks_play());
    }

    #[test]
    fn reward_event_shows_a_toast_without_blocking() {
        let mut outcome = accepted(EventKind::Reward);
        let reward = Reward {
            id: "r1".to_string(),
            name: "Golden corn".to_string(),
            value: 15,
        };
        outcome.reward = Some(reward.clone());
        let action = dispatch(&outcome, false);
        assert_eq!(action, Action::ShowReward(reward));
        assert!(!action.blocks_play());
    }

    #[test]
    fn event_without_its_payload_continues() {
        assert_eq!(
            dispatch(&accepted(EventKind::Knowledge), false),
            Action::Continue
        );
        assert_eq!(
            dispatch(&accepted(EventKind::Challenge), false),
            Action::Continue
        );
        assert_eq!(
            dispatch(&accepted(EventKind::Reward), false),
            Action::Continue
        );
    }

    #[test]
    fn goal_completes_once() {
        assert_eq!(dispatch(&accepted(EventKind::Goal), false), Action::Complete);
        assert_eq!(dispatch(&accepted(EventKind::Goal), true), Action::Continue);
    }
}
