mod common;

use common::{EmptyProvider, FailingProvider, Harness};
use hextech::kernel::chat::Sender;
use hextech::kernel::fixtures::{copy, EMPTY_MENTION_QUERY, EMPTY_REPLY, FALLBACK_REPLY};
use hextech::kernel::log::LogRole;
use hextech::kernel::state::{GameContext, Mode};
use hextech::services::llm::CannedProvider;
use hextech::kernel::fixtures::replies;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_voice_run_emits_stages_in_order() {
    let mut h = Harness::fixed("稳住发育");
    h.set_mode(Mode::SingleTurnVoice).await;
    h.say("中单很强").await;
    h.run_until(20_000).await;

    assert_eq!(
        h.roles(),
        vec![
            LogRole::Asr,
            LogRole::Vad,
            LogRole::Nlp,
            LogRole::Llm,
            LogRole::Llm,
            LogRole::Tts,
            LogRole::Tts,
            LogRole::System,
        ]
    );
    let contents = h.contents();
    assert_eq!(contents[0], copy::asr_query("中单很强"));
    assert_eq!(contents[4], copy::llm_result("稳住发育"));
    assert_eq!(contents[7], copy::SESSION_CLOSED);
    assert_eq!(h.completed, vec![(1, "稳住发育".to_string())]);
}

#[tokio::test]
async fn test_voice_run_stage_timing() {
    let mut h = Harness::fixed("稳住发育");
    h.set_mode(Mode::SingleTurnVoice).await;
    h.say("中单很强").await;

    h.run_until(4_599).await;
    assert!(!h.ai().is_speaking);

    h.run_until(4_600).await;
    assert!(h.ai().is_speaking);
    assert_eq!(h.ai().response.as_deref(), Some("稳住发育"));

    h.run_until(9_599).await;
    assert!(h.ai().is_speaking);
    h.run_until(9_600).await;
    assert!(!h.ai().is_speaking);
    assert_eq!(h.ai().response, None);

    let stamps: Vec<u64> = h.logs().iter().map(|e| e.timestamp.ms).collect();
    assert_eq!(stamps, vec![0, 600, 1_000, 1_800, 3_000, 3_600, 4_600, 9_600]);
}

#[tokio::test]
async fn test_thinking_floor_absorbs_provider_latency() {
    for (latency, expected_result_at) in [(0, 3_000), (500, 3_000), (1_200, 3_000), (2_000, 3_800)] {
        let mut h = Harness::fixed("ok").with_latency(latency);
        h.set_mode(Mode::MultiTurnVoice).await;
        h.say("打野在哪").await;

        h.run_until(1_800).await;
        assert!(h.ai().is_thinking, "thinking starts with the request");

        h.run_until(20_000).await;
        assert_eq!(h.stamps_of(&copy::llm_result("ok")), vec![expected_result_at], "latency {}", latency);
        assert!(!h.ai().is_thinking);
    }
}

#[tokio::test]
async fn test_provider_invoked_exactly_once() {
    let mut h = Harness::canned().with_latency(300);
    h.set_mode(Mode::FullDuplex).await;
    h.say("对面出什么装备").await;
    h.run_until(30_000).await;

    assert_eq!(h.requests.len(), 1);
    assert_eq!(h.requests[0].query, "对面出什么装备");
    assert_eq!(h.requests[0].context, GameContext::Normal);
    assert_eq!(h.completed.len(), 1);
    assert_eq!(h.completed[0].1, replies::SHOP_ADVICE);
}

#[tokio::test]
async fn test_failing_provider_degrades_to_fallback() {
    let mut h = Harness::new(FailingProvider);
    h.set_mode(Mode::SingleTurnVoice).await;
    h.say("中单很强").await;

    h.run_until(5_000).await;
    assert_eq!(h.ai().response.as_deref(), Some(FALLBACK_REPLY));
    assert!(h.contents().contains(&copy::llm_result(FALLBACK_REPLY)));

    h.run_until(20_000).await;
    assert_eq!(h.contents().last().map(String::as_str), Some(copy::SESSION_CLOSED));
}

#[tokio::test]
async fn test_empty_reply_uses_placeholder() {
    let mut h = Harness::new(EmptyProvider);
    h.say("推荐核心三件套").await;
    h.run_until(100).await;
    assert_eq!(h.ai().response.as_deref(), Some(EMPTY_REPLY));
}

#[tokio::test]
async fn test_guided_query_speaks_without_logs() {
    let mut h = Harness::fixed("先去下路帮线").with_latency(400);
    assert_eq!(h.reactor.mode(), Mode::GuidedQuery);

    h.say("现在该去哪发育？").await;
    assert!(h.ai().is_thinking);
    assert!(!h.ai().is_speaking);

    h.run_until(400).await;
    assert!(!h.ai().is_thinking);
    assert!(h.ai().is_speaking);
    assert_eq!(h.ai().response.as_deref(), Some("先去下路帮线"));

    h.run_until(5_399).await;
    assert!(h.ai().is_speaking);
    h.run_until(5_400).await;
    assert!(!h.ai().is_speaking);
    assert_eq!(h.ai().response, None);
    assert_eq!(h.log_len(), 0, "guided mode writes no pipeline log");
}

#[tokio::test]
async fn test_text_chat_answers_only_mentions() {
    let mut h = Harness::new(CannedProvider::new());
    h.set_mode(Mode::TextChat).await;

    h.say("队友在干嘛").await;
    h.run_until(1_000).await;
    assert!(h.requests.is_empty());
    assert_eq!(h.reactor.state().chat().len(), 2);

    h.say("@AI 打野在哪").await;
    h.run_until(2_000).await;
    assert_eq!(h.requests.len(), 1);
    assert_eq!(h.requests[0].query, "打野在哪");

    let chat = h.reactor.state().chat().messages().to_vec();
    let senders: Vec<Sender> = chat.iter().map(|m| m.sender).collect();
    assert_eq!(senders, vec![Sender::System, Sender::Player, Sender::Player, Sender::Ai]);
    assert_eq!(chat[3].text, replies::JUNGLE_TRACKING);
    assert!(!h.ai().is_speaking, "text chat never speaks");
    assert_eq!(h.log_len(), 0);
}

#[tokio::test]
async fn test_bare_mention_uses_greeting_query() {
    let mut h = Harness::fixed("在");
    h.set_mode(Mode::TextChat).await;
    h.say("  @ai ").await;
    h.run_until(10).await;
    assert_eq!(h.requests[0].query, EMPTY_MENTION_QUERY);
}

#[tokio::test]
async fn test_new_run_supersedes_in_flight_run() {
    let mut h = Harness::fixed("ok").with_latency(2_000);
    h.set_mode(Mode::SingleTurnVoice).await;
    h.say("第一句").await;

    // First request goes out at 1800 and would answer at 3800.
    h.run_until(2_000).await;
    assert_eq!(h.requests.len(), 1);
    assert!(h.ai().is_thinking);

    h.say("第二句").await;
    assert!(!h.ai().is_thinking, "invalidation clears thinking");

    h.run_until(30_000).await;
    assert_eq!(h.requests.len(), 2);
    assert_eq!(h.completed, vec![(2, "ok".to_string())]);
    assert_eq!(h.stamps_of(&copy::llm_result("ok")), vec![2_000 + 1_800 + 2_000]);
    assert_eq!(h.stamps_of(copy::SESSION_CLOSED).len(), 1);
}

#[tokio::test]
async fn test_mode_switch_drops_late_reply() {
    let mut h = Harness::fixed("ok").with_latency(500);
    h.set_mode(Mode::SingleTurnVoice).await;
    h.say("中单很强").await;
    h.run_until(2_000).await;

    h.set_mode(Mode::GuidedQuery).await;
    h.run_until(20_000).await;

    assert!(h.completed.is_empty());
    assert_eq!(h.log_len(), 0);
    assert!(!h.ai().is_speaking && !h.ai().is_thinking);
}

#[tokio::test]
async fn test_session_uses_current_game_context() {
    let mut h = Harness::canned();
    h.command(hextech::kernel::event::Command::SetGameContext(GameContext::Dead)).await;
    h.say("复盘死亡原因").await;
    h.run_until(10).await;

    assert_eq!(h.requests[0].context, GameContext::Dead);
    assert_eq!(h.ai().response.as_deref(), Some(replies::DEATH_ANALYSIS));
    println!("Session ran under DEAD context");
}

#[tokio::test]
async fn test_text_chat_answers_overlapping_mentions() {
    let mut h = Harness::fixed("收到").with_latency(500);
    h.set_mode(Mode::TextChat).await;

    h.say("@ai 第一").await;
    h.run_until(100).await;
    h.say("@ai 第二").await;
    assert_eq!(h.reactor.session().pending_chats(), 2);

    h.run_until(5_000).await;
    assert_eq!(h.requests.len(), 2);
    assert_eq!(h.completed, vec![(1, "收到".to_string()), (2, "收到".to_string())]);
    assert_eq!(h.reactor.session().pending_chats(), 0);

    let senders: Vec<Sender> = h.reactor.state().chat().messages().iter().map(|m| m.sender).collect();
    assert_eq!(
        senders,
        vec![Sender::System, Sender::Player, Sender::Player, Sender::Ai, Sender::Ai]
    );
}

#[tokio::test]
async fn test_mode_switch_drops_pending_chat_reply() {
    let mut h = Harness::fixed("收到").with_latency(500);
    h.set_mode(Mode::TextChat).await;
    h.say("@ai 第一").await;

    h.set_mode(Mode::GuidedQuery).await;
    h.run_until(5_000).await;
    assert!(h.completed.is_empty());
    assert_eq!(h.reactor.session().pending_chats(), 0);
}

#[tokio::test]
async fn test_whitespace_reply_is_shown_verbatim() {
    let mut h = Harness::fixed("  ");
    h.say("推荐核心三件套").await;
    h.run_until(100).await;
    assert_eq!(h.ai().response.as_deref(), Some("  "));
}
