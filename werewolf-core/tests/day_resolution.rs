//! Day resolution against a scripted nine-player table.
//!
//! Seats: Player1 villager, Player2-4 werewolves, Player5 seer,
//! Player6 witch, Player7 hunter, Player8-9 villagers.

use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use werewolf_core::testing::{
    check, poison, save, say, shoot, vote_for, ScriptedAgent, TestTable, SPEECH,
};
use werewolf_core::{Game, GameEvent, Reply, SpeakingOrderPolicy};

fn votes(table: &TestTable, ballots: &[(&str, &str)]) {
    for (voter, target) in ballots {
        table.agent(voter).always("vote", vote_for(target));
    }
}

fn with_events(table: &TestTable) -> (Game, mpsc::UnboundedReceiver<GameEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (table.build().unwrap().with_events(tx), rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<GameEvent>) -> Vec<GameEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn vote_result(events: &[GameEvent]) -> Option<(String, Option<String>)> {
    events.iter().find_map(|e| match e {
        GameEvent::VoteResult { detail, eliminated } => Some((detail.clone(), eliminated.clone())),
        _ => None,
    })
}

fn speaking_order(events: &[GameEvent]) -> Vec<String> {
    events
        .iter()
        .find_map(|e| match e {
            GameEvent::SpeakingOrder(order) => Some(order.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

fn position(history: &[werewolf_core::message::Message], needle: &str) -> usize {
    history
        .iter()
        .position(|m| m.content.contains(needle))
        .unwrap_or_else(|| panic!("no message containing {needle:?}"))
}

#[tokio::test]
async fn test_first_night_victim_speaks_before_discussion() {
    let table = TestTable::new();
    for wolf in table.wolves() {
        wolf.always("vote", vote_for("Player1"));
    }
    table.agent("Player6").queue("save", save(false)).queue("poison", poison(None));
    table.agent("Player5").queue("check_identity", check("Player2"));
    table.agent("Player1").queue(SPEECH, say("Goodbye, I was a plain villager"));
    let mut game = table.build().unwrap();

    game.run_night().await;
    assert!(!game.state().alive_players().contains(&"Player1".to_string()));
    assert_eq!(game.state().alive_players().len(), 8);

    game.run_day().await;

    let last_words = &table.agent("Player1").calls_for(SPEECH)[0];
    assert!(last_words.prompt.contains("Player1, you're eliminated now"));

    let history = game.dispatcher().history("Player8").await;
    let dawn = position(&history, "the following player(s) have been eliminated: Player1.");
    let farewell = position(&history, "Player1: Goodbye, I was a plain villager");
    let discussion = position(&history, "it's time to discuss");
    assert!(dawn < farewell);
    assert!(farewell < discussion);
}

#[tokio::test]
async fn test_later_night_deaths_get_no_last_words() {
    let table = TestTable::new();
    table.agent("Player1").always(SPEECH, say("one more thing"));
    let mut game = table.build().unwrap();
    game.state().set_round(2);
    game.state().set_first_night(false);
    game.state().set_night_killed(Some("Player1".to_string()));
    game.state().kill_player("Player1");

    game.run_day().await;

    assert!(table.agent("Player1").calls().is_empty());
    let history = game.dispatcher().history("Player9").await;
    assert!(history.iter().any(|m| m.content.contains("have been eliminated: Player1.")));
}

#[tokio::test]
async fn test_peaceful_night_is_announced() {
    let table = TestTable::new();
    let mut game = table.build().unwrap();

    game.run_day().await;

    let history = game.dispatcher().history("Player4").await;
    assert!(history.iter().any(|m| m.content.contains("Last night was peaceful")));
}

#[tokio::test]
async fn test_plurality_eliminates_after_last_words() {
    let table = TestTable::new();
    votes(
        &table,
        &[
            ("Player1", "Player2"),
            ("Player5", "Player2"),
            ("Player6", "Player2"),
            ("Player7", "Player2"),
            ("Player8", "Player2"),
            ("Player9", "Player2"),
            ("Player2", "Player1"),
            ("Player3", "Player1"),
            ("Player4", "Player1"),
        ],
    );
    table.agent("Player2").always(SPEECH, say("I am innocent"));
    let (mut game, mut rx) = with_events(&table);

    game.run_day().await;

    assert!(!game.state().is_alive("Player2"));
    assert_eq!(game.state().alive_players().len(), 8);

    let speeches = table.agent("Player2").calls_for(SPEECH);
    assert_eq!(speeches.len(), 2, "one discussion turn and last words");
    assert!(speeches[1].prompt.contains("you're eliminated now"));

    let (detail, eliminated) = vote_result(&drain(&mut rx)).unwrap();
    assert_eq!(detail, "Player1:3, Player2:6");
    assert_eq!(eliminated.as_deref(), Some("Player2"));
}

#[tokio::test]
async fn test_tied_vote_eliminates_nobody() {
    let table = TestTable::new();
    votes(
        &table,
        &[
            ("Player1", "Player8"),
            ("Player2", "Player8"),
            ("Player3", "Player8"),
            ("Player4", "Player8"),
            ("Player5", "Player2"),
            ("Player6", "Player2"),
            ("Player7", "Player2"),
            ("Player8", "Player2"),
        ],
    );
    let (mut game, mut rx) = with_events(&table);

    game.run_day().await;

    assert_eq!(game.state().alive_players().len(), 9);
    let events = drain(&mut rx);
    let (detail, eliminated) = vote_result(&events).unwrap();
    assert_eq!(detail, "Player2:4, Player8:4");
    assert_eq!(eliminated, None);
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::Announcement(text) if text.contains("The vote is tied")
    )));
}

#[tokio::test]
async fn test_self_votes_are_not_counted() {
    let table = TestTable::new();
    // Counted, Player9's self-vote would make them the unique leader.
    votes(
        &table,
        &[
            ("Player3", "Player9"),
            ("Player8", "Player1"),
            ("Player9", "Player9"),
        ],
    );
    let (mut game, mut rx) = with_events(&table);

    game.run_day().await;

    assert_eq!(game.state().alive_players().len(), 9);
    let events = drain(&mut rx);
    let (detail, eliminated) = vote_result(&events).unwrap();
    assert_eq!(detail, "Player1:1, Player9:1");
    assert_eq!(eliminated, None);
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::ActionRejected { player, action: "vote", .. } if player == "Player9"
    )));
}

#[tokio::test]
async fn test_no_valid_votes() {
    let table = TestTable::new();
    let (mut game, mut rx) = with_events(&table);

    game.run_day().await;

    let events = drain(&mut rx);
    assert_eq!(vote_result(&events), Some((String::new(), None)));
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::Announcement(text) if text.contains("no valid votes")
    )));
}

#[tokio::test]
async fn test_voted_out_hunter_shoots() {
    let table = TestTable::new();
    let ballots: Vec<(&str, &str)> = ["Player1", "Player2", "Player3", "Player4", "Player5", "Player6", "Player8"]
        .into_iter()
        .map(|voter| (voter, "Player7"))
        .collect();
    votes(&table, &ballots);
    table.agent("Player7").queue("shoot", shoot(Some("Player2")));
    let mut game = table.build().unwrap();

    game.run_day().await;

    let state = game.state();
    assert!(!state.is_alive("Player7"));
    assert!(!state.is_alive("Player2"));
    assert_eq!(state.alive_players().len(), 7);
    let history = game.dispatcher().history("Player9").await;
    assert!(history.iter().any(|m| m.content.contains("shoot Player2 down")));
}

#[tokio::test]
async fn test_voted_out_hunter_may_hold_fire() {
    let table = TestTable::new();
    votes(&table, &[("Player1", "Player7"), ("Player2", "Player7")]);
    table.agent("Player7").queue("shoot", shoot(None));
    let mut game = table.build().unwrap();

    game.run_day().await;

    assert!(!game.state().is_alive("Player7"));
    assert_eq!(game.state().alive_players().len(), 8);
}

#[tokio::test]
async fn test_decided_game_skips_discussion() {
    let table = TestTable::new();
    let mut game = table.build().unwrap();
    for name in ["Player1", "Player5", "Player6", "Player7"] {
        game.state().kill_player(name);
    }

    game.run_day().await;

    for name in ["Player2", "Player3", "Player4", "Player8", "Player9"] {
        assert!(table.agent(name).calls().is_empty(), "{name} was asked to act");
    }
}

#[tokio::test]
async fn test_speeches_reach_everyone_and_accusations_follow_into_votes() {
    let table = TestTable::new();
    table
        .agent("Player1")
        .queue(SPEECH, say("I suspect Player3 is a werewolf"));
    let mut game = table.build().unwrap();

    game.run_day().await;

    let history = game.dispatcher().history("Player8").await;
    assert!(history
        .iter()
        .any(|m| m.content == "Player1: I suspect Player3 is a werewolf"));

    let ballot = &table.agent("Player3").calls_for("vote")[0];
    assert!(ballot.prompt.contains("Player1 suspects you"));
}

#[tokio::test]
async fn test_rotating_order_moves_one_seat_per_round() {
    let table = TestTable::new().configure(|c| c.with_speaking_order(SpeakingOrderPolicy::Rotating));
    let (mut game, mut rx) = with_events(&table);
    game.state().set_round(2);

    game.run_day().await;

    let order = speaking_order(&drain(&mut rx));
    assert_eq!(order.first().map(String::as_str), Some("Player2"));
    assert_eq!(order.last().map(String::as_str), Some("Player1"));
    assert_eq!(order.len(), 9);
}

#[tokio::test]
async fn test_moderator_picks_order() {
    let table = TestTable::new().configure(|c| c.with_speaking_order(SpeakingOrderPolicy::Moderator));
    let moderator = Arc::new(ScriptedAgent::new());
    moderator.always(
        "speaking_order",
        Reply::text(r#"Let's begin. {"start": "Player5", "direction": "counterclockwise", "reason": "seat after the dead"}"#),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut game = table.build().unwrap().with_events(tx).with_moderator(moderator.clone());

    game.run_day().await;

    let order = speaking_order(&drain(&mut rx));
    assert_eq!(
        order,
        ["Player5", "Player4", "Player3", "Player2", "Player1", "Player9", "Player8", "Player7", "Player6"]
    );
    assert!(moderator.calls()[0].prompt.contains("Alive players (seat order)"));
}

#[tokio::test]
async fn test_moderator_fallbacks() {
    // Unknown first speaker: rotating seat.
    let table = TestTable::new().configure(|c| c.with_speaking_order(SpeakingOrderPolicy::Moderator));
    let moderator = Arc::new(ScriptedAgent::new());
    moderator.always("speaking_order", Reply::structured(json!({"start": "Player42"})));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut game = table.build().unwrap().with_events(tx).with_moderator(moderator);
    game.state().set_round(3);
    game.run_day().await;
    assert_eq!(speaking_order(&drain(&mut rx))[0], "Player3");

    // No first speaker named: rotating seat.
    let table = TestTable::new().configure(|c| c.with_speaking_order(SpeakingOrderPolicy::Moderator));
    let moderator = Arc::new(ScriptedAgent::new());
    moderator.always(
        "speaking_order",
        Reply::structured(json!({"direction": "clockwise", "reason": "quiet night"})),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut game = table.build().unwrap().with_events(tx).with_moderator(moderator);
    game.state().set_round(3);
    game.run_day().await;
    assert_eq!(speaking_order(&drain(&mut rx))[0], "Player3");

    // Unreadable reply: roster order.
    let table = TestTable::new().configure(|c| c.with_speaking_order(SpeakingOrderPolicy::Moderator));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut game = table
        .build()
        .unwrap()
        .with_events(tx)
        .with_moderator(Arc::new(ScriptedAgent::new()));
    game.state().set_round(3);
    game.run_day().await;
    assert_eq!(speaking_order(&drain(&mut rx))[0], "Player1");
}
