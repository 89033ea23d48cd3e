//! Whole games against a scripted table, plus setup failures.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use werewolf_core::testing::{say, vote_for, ScriptedAgent, TestTable, SPEECH};
use werewolf_core::{
    Agent, Faction, Game, GameConfig, GameEvent, GameOutcome, Role, SetupError,
};

fn drain(rx: &mut mpsc::UnboundedReceiver<GameEvent>) -> Vec<GameEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_village_votes_out_every_wolf() {
    let table = TestTable::new();
    for name in ["Player1", "Player5", "Player6", "Player7", "Player8", "Player9"] {
        let agent = table.agent(name);
        agent
            .queue("vote", vote_for("Player2"))
            .queue("vote", vote_for("Player3"))
            .queue("vote", vote_for("Player4"));
    }
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut game = table.build().unwrap().with_events(tx);

    let report = game.run().await;

    assert_eq!(report.outcome, GameOutcome::Winner(Faction::Villagers));
    assert_eq!(report.winner(), Some(Faction::Villagers));
    assert_eq!(report.rounds_played, 3);
    assert_eq!(
        report.survivors,
        ["Player1", "Player5", "Player6", "Player7", "Player8", "Player9"]
    );
    assert_eq!(report.roles.len(), 9);
    assert!(report
        .roles
        .iter()
        .filter(|p| p.role == Role::Werewolf)
        .all(|p| !p.alive));

    let events = drain(&mut rx);
    assert!(matches!(events.first(), Some(GameEvent::GameStarted { .. })));
    let rounds: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::RoundStarted(r) => Some(*r),
            _ => None,
        })
        .collect();
    assert_eq!(rounds, [1, 2, 3]);

    let history = game.dispatcher().history("Player8").await;
    assert!(history
        .iter()
        .any(|m| m.content.contains("All the werewolves have been eliminated")));
}

#[tokio::test]
async fn test_wolves_reach_parity() {
    let table = TestTable::new();
    // Night one, day one, night two.
    for wolf in table.wolves() {
        wolf.queue("vote", vote_for("Player1"))
            .queue("vote", vote_for("Player5"))
            .queue("vote", vote_for("Player6"));
    }
    let mut game = table.build().unwrap();

    let report = game.run().await;

    assert_eq!(report.winner(), Some(Faction::Werewolves));
    assert_eq!(report.rounds_played, 2);
    assert_eq!(
        report.survivors,
        ["Player2", "Player3", "Player4", "Player7", "Player8", "Player9"]
    );
    // The game ended at night, so nobody was asked to vote on day two.
    assert_eq!(table.agent("Player8").calls_for("vote").len(), 1);
}

#[tokio::test]
async fn test_round_cap_ends_the_game() {
    let table = TestTable::new().configure(|c| c.with_max_rounds(2));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut game = table.build().unwrap().with_events(tx);

    let report = game.run().await;

    assert_eq!(report.outcome, GameOutcome::MaxRoundsReached);
    assert_eq!(report.winner(), None);
    assert_eq!(report.rounds_played, 2);
    assert_eq!(report.survivors.len(), 9);
    assert!(!game.state().is_first_night());

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::GameOver { outcome: GameOutcome::MaxRoundsReached, .. }
    )));
}

#[tokio::test]
async fn test_everyone_reflects_after_the_game() {
    let table = TestTable::new().configure(|c| c.with_max_rounds(1));
    for name in ["Player1", "Player2"] {
        table.agent(name).always(SPEECH, say("I played well"));
    }
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut game = table.build().unwrap().with_events(tx);

    game.run().await;

    let events = drain(&mut rx);
    let over = events
        .iter()
        .position(|e| matches!(e, GameEvent::GameOver { .. }))
        .unwrap();
    let reflections: Vec<(&str, Role)> = events[over..]
        .iter()
        .filter_map(|e| match e {
            GameEvent::Reflection { player, role, .. } => Some((player.as_str(), *role)),
            _ => None,
        })
        .collect();
    assert_eq!(reflections.len(), 9);
    assert!(reflections.contains(&("Player2", Role::Werewolf)));

    let prompt = table.agent("Player1").calls_for(SPEECH).pop().unwrap().prompt;
    assert!(prompt.contains("reflect on their performance"));
}

#[tokio::test]
async fn test_transcript_is_saved() {
    let dir = tempfile::tempdir().unwrap();
    let log_dir = dir.path().to_path_buf();
    let table = TestTable::new().configure(|c| c.with_max_rounds(1).with_log_dir(log_dir));
    let mut game = table.build().unwrap();

    game.run().await;
    let saved = game.save_transcript().await.unwrap();

    assert_eq!(saved, dir.path().join(game.game_id()));
    let full = std::fs::read_to_string(saved.join("full_log.md")).unwrap();
    assert!(full.contains("| Player7 | hunter |"));
    assert!(full.contains("## Round 1"));
    assert!(full.contains("max rounds reached"));
    let replay = std::fs::read_to_string(saved.join("replay.md")).unwrap();
    assert!(replay.contains("max rounds reached"));
}

fn scripted_agents(names: &[String]) -> HashMap<String, Arc<dyn Agent>> {
    names
        .iter()
        .map(|name| (name.clone(), Arc::new(ScriptedAgent::new()) as Arc<dyn Agent>))
        .collect()
}

#[test]
fn test_every_seat_needs_an_agent() {
    let config = GameConfig::standard();
    let mut agents = scripted_agents(&config.players);
    agents.remove("Player9");

    match Game::new(config, agents) {
        Err(SetupError::MissingAgent(name)) => assert_eq!(name, "Player9"),
        other => panic!("expected MissingAgent, got {:?}", other.err()),
    }
}

#[test]
fn test_role_deck_must_match_roster() {
    let config = GameConfig::standard().with_roles(vec![Role::Werewolf; 8]);
    let agents = scripted_agents(&config.players);

    assert!(matches!(
        Game::new(config, agents),
        Err(SetupError::RoleCountMismatch { players: 9, roles: 8 })
    ));
}

#[test]
fn test_human_seat_must_exist() {
    let config = GameConfig::standard().with_human_player("Player42");
    let agents = scripted_agents(&config.players);

    match Game::new(config, agents) {
        Err(err @ SetupError::UnknownHumanPlayer { .. }) => {
            assert!(err.to_string().contains("Player42"));
            assert!(err.to_string().contains("Player1, Player2"));
        }
        other => panic!("expected UnknownHumanPlayer, got {:?}", other.err()),
    }
}
