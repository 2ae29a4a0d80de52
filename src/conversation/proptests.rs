//! Property-based tests for transcript growth and history replay
//!
//! For arbitrary sequences of submissions (blank, succeeding, failing):
//! - the transcript only ever grows, and earlier turns never change
//! - every chat is seeded with exactly the turns that preceded the new user turn
//! - with only successes, length is `1 + 2N` and speakers alternate

use super::*;
use crate::llm::testing::MockChatModel;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Blank(String),
    Succeed { text: String, reply: String },
    Fail { text: String },
}

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9 ,.!?]{0,40}"
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        1 => prop_oneof![Just(String::new()), Just("   ".to_string()), Just("\n".to_string())]
            .prop_map(Step::Blank),
        4 => (arb_text(), arb_text()).prop_map(|(text, reply)| Step::Succeed { text, reply }),
        1 => arb_text().prop_map(|text| Step::Fail { text }),
    ]
}

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(fut)
}

proptest! {
    #[test]
    fn prop_history_is_everything_before_the_pending_turn(steps in proptest::collection::vec(arb_step(), 0..20)) {
        let mock = MockChatModel::new("mock");
        let mut conv = Conversation::new();
        conv.initialize();

        let mut remote_calls = 0;
        for step in &steps {
            let before = conv.transcript().clone();
            match step {
                Step::Blank(text) => {
                    let outcome = block_on(conv.submit(&mock, text)).unwrap();
                    prop_assert_eq!(outcome, SubmitOutcome::Ignored);
                    prop_assert_eq!(conv.transcript(), &before);
                }
                Step::Succeed { text, reply } => {
                    mock.queue_reply(reply.clone());
                    block_on(conv.submit(&mock, text)).unwrap();
                    remote_calls += 1;
                    prop_assert_eq!(conv.transcript().len(), before.len() + 2);
                }
                Step::Fail { text } => {
                    mock.queue_error(LlmError::server_error("boom"));
                    prop_assert!(block_on(conv.submit(&mock, text)).is_err());
                    remote_calls += 1;
                    prop_assert_eq!(conv.transcript().len(), before.len() + 1);
                }
            }

            // Append-only: the old transcript is a prefix of the new one
            prop_assert_eq!(&conv.transcript().turns()[..before.len()], before.turns());

            if !matches!(step, Step::Blank(_)) {
                let seeded = mock.started_histories().last().cloned().unwrap();
                let expected: Vec<ChatTurn> = before.turns().iter().map(Turn::to_chat_turn).collect();
                prop_assert_eq!(seeded, expected);
            }
        }
        prop_assert_eq!(mock.sent_messages().len(), remote_calls);
    }

    #[test]
    fn prop_successful_turns_alternate(texts in proptest::collection::vec(arb_text(), 0..15)) {
        let mock = MockChatModel::new("mock");
        let mut conv = Conversation::new();
        conv.initialize();

        for (i, text) in texts.iter().enumerate() {
            mock.queue_reply(format!("reply {i}"));
            block_on(conv.submit(&mock, text)).unwrap();
        }

        let turns = conv.transcript().turns();
        prop_assert_eq!(turns.len(), 1 + 2 * texts.len());
        prop_assert_eq!(turns[0].speaker(), Speaker::Assistant);
        for (i, turn) in turns.iter().enumerate().skip(1) {
            let expected = if i % 2 == 1 { Speaker::User } else { Speaker::Assistant };
            prop_assert_eq!(turn.speaker(), expected);
        }
    }
}
