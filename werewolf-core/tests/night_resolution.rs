//! Night resolution against a scripted nine-player table.
//!
//! Seats: Player1 villager, Player2-4 werewolves, Player5 seer,
//! Player6 witch, Player7 hunter, Player8-9 villagers.

use tokio::sync::mpsc;
use werewolf_core::prompts::EnglishPrompts;
use werewolf_core::testing::{check, discuss, poison, save, shoot, vote_for, TestTable};
use werewolf_core::{Game, GameEvent, Phase};

fn wolves_kill(table: &TestTable, victim: &str) {
    for wolf in table.wolves() {
        wolf.always("vote", vote_for(victim));
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

#[tokio::test]
async fn test_werewolf_kill_lands_when_witch_declines() {
    let table = TestTable::new();
    wolves_kill(&table, "Player1");
    table.agent("Player6").queue("save", save(false)).queue("poison", poison(None));
    table.agent("Player5").queue("check_identity", check("Player2"));
    let mut game = table.build().unwrap();

    game.run_night().await;

    let state = game.state();
    assert!(!state.is_alive("Player1"));
    assert_eq!(state.alive_players().len(), 8);
    assert!(state.can_use_healing_potion());
    assert!(state.can_use_poison_potion());

    // Only the seer learns the result.
    let seer_history = game.dispatcher().history("Player5").await;
    assert!(seer_history
        .iter()
        .any(|m| m.content.contains("You've checked Player2, and the result is: a werewolf")));
    for other in ["Player1", "Player2", "Player6", "Player8"] {
        let history = game.dispatcher().history(other).await;
        assert!(!history.iter().any(|m| m.content.contains("You've checked")), "{other} saw the check");
    }

    // Wolves heard the result, villagers did not.
    let wolf_history = game.dispatcher().history("Player3").await;
    assert!(wolf_history.iter().any(|m| m.content.contains("eliminate Player1")));
    let villager_history = game.dispatcher().history("Player8").await;
    assert!(!villager_history.iter().any(|m| m.content.contains("WEREWOLVES ONLY")));
}

#[tokio::test]
async fn test_witch_save_prevents_death_and_skips_poison() {
    let table = TestTable::new();
    wolves_kill(&table, "Player1");
    table.agent("Player6").queue("save", save(true));
    let mut game = table.build().unwrap();

    game.run_night().await;

    assert_eq!(game.state().alive_players().len(), 9);
    assert!(game.state().night_saved());
    assert!(!game.state().can_use_healing_potion());
    // One potion per night.
    assert!(table.agent("Player6").calls_for("poison").is_empty());
}

#[tokio::test]
async fn test_healing_potion_is_single_use() {
    let table = TestTable::new();
    wolves_kill(&table, "Player1");
    table.agent("Player6").always("save", save(true)).always("poison", poison(None));
    let mut game = table.build().unwrap();

    game.run_night().await;
    assert!(game.state().is_alive("Player1"));

    game.state().set_round(2);
    game.run_night().await;

    // Not even asked the second night.
    assert_eq!(table.agent("Player6").calls_for("save").len(), 1);
    assert!(!game.state().is_alive("Player1"));
}

#[tokio::test]
async fn test_witch_poison_kills_second_player() {
    let table = TestTable::new();
    wolves_kill(&table, "Player1");
    table
        .agent("Player6")
        .queue("save", save(false))
        .queue("poison", poison(Some("Player3")));
    let mut game = table.build().unwrap();

    game.run_night().await;

    let state = game.state();
    assert!(!state.is_alive("Player1"));
    assert!(!state.is_alive("Player3"));
    assert_eq!(state.night_poisoned().as_deref(), Some("Player3"));
    assert!(!state.can_use_poison_potion());
}

#[tokio::test]
async fn test_witch_cannot_poison_herself() {
    let table = TestTable::new();
    table.agent("Player6").queue("poison", poison(Some("Player6")));
    let (mut game, mut rx) = with_events(&table);

    game.run_night().await;

    assert!(game.state().is_alive("Player6"));
    assert!(game.state().can_use_poison_potion());
    assert!(drain(&mut rx).iter().any(|e| matches!(
        e,
        GameEvent::ActionRejected { player, action: "poison", .. } if player == "Player6"
    )));
}

#[tokio::test]
async fn test_witch_is_not_offered_a_self_save() {
    let table = TestTable::new();
    wolves_kill(&table, "Player6");
    table.agent("Player6").always("save", save(true));
    let mut game = table.build().unwrap();

    game.run_night().await;

    assert!(table.agent("Player6").calls_for("save").is_empty());
    assert!(!game.state().is_alive("Player6"));
    assert!(game.state().can_use_healing_potion());
}

#[tokio::test]
async fn test_hunter_killed_by_wolves_shoots() {
    let table = TestTable::new();
    wolves_kill(&table, "Player7");
    table.agent("Player6").queue("save", save(false)).queue("poison", poison(None));
    table.agent("Player7").queue("shoot", shoot(Some("Player2")));
    let mut game = table.build().unwrap();

    game.run_night().await;

    let state = game.state();
    assert_eq!(state.night_shot().as_deref(), Some("Player2"));
    assert!(!state.is_alive("Player7"));
    assert!(!state.is_alive("Player2"));
    assert_eq!(state.alive_players().len(), 7);
}

#[tokio::test]
async fn test_poisoned_hunter_never_shoots() {
    let table = TestTable::new();
    wolves_kill(&table, "Player7");
    table
        .agent("Player6")
        .queue("save", save(false))
        .queue("poison", poison(Some("Player7")));
    table.agent("Player7").always("shoot", shoot(Some("Player2")));
    let mut game = table.build().unwrap();

    game.run_night().await;

    assert!(table.agent("Player7").calls_for("shoot").is_empty());
    assert_eq!(game.state().night_shot(), None);
    assert!(game.state().is_alive("Player2"));
    assert_eq!(game.state().alive_players().len(), 8);
}

#[tokio::test]
async fn test_hunter_cannot_waste_shot_on_poison_victim() {
    let table = TestTable::new();
    wolves_kill(&table, "Player7");
    table
        .agent("Player6")
        .queue("save", save(false))
        .queue("poison", poison(Some("Player8")));
    table.agent("Player7").queue("shoot", shoot(Some("Player8")));
    let mut game = table.build().unwrap();

    game.run_night().await;

    let state = game.state();
    assert_eq!(state.night_shot(), None);
    assert!(!state.is_alive("Player7"));
    assert!(!state.is_alive("Player8"));
    assert_eq!(state.alive_players().len(), 7);
}

#[tokio::test]
async fn test_hunter_saved_by_witch_does_not_shoot() {
    let table = TestTable::new();
    wolves_kill(&table, "Player7");
    table.agent("Player6").queue("save", save(true));
    table.agent("Player7").always("shoot", shoot(Some("Player2")));
    let mut game = table.build().unwrap();

    game.run_night().await;

    assert!(table.agent("Player7").calls_for("shoot").is_empty());
    assert_eq!(game.state().alive_players().len(), 9);
}

#[tokio::test]
async fn test_split_wolf_vote_takes_lowest_name_and_rejects_friendly_fire() {
    let table = TestTable::new();
    table.agent("Player2").always("vote", vote_for("Player9"));
    table.agent("Player3").always("vote", vote_for("Player8"));
    table.agent("Player4").always("vote", vote_for("Player3"));
    let (mut game, mut rx) = with_events(&table);

    game.run_night().await;

    assert_eq!(game.state().night_killed().as_deref(), Some("Player8"));
    assert!(!game.state().is_alive("Player8"));
    assert!(game.state().is_alive("Player3"));

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::ActionRejected { player, action: "kill vote", .. } if player == "Player4"
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::WerewolfKill { target: Some(t), detail } if t == "Player8" && detail == "Player8:1, Player9:1"
    )));
}

#[tokio::test]
async fn test_silent_table_is_a_peaceful_night() {
    let table = TestTable::new();
    let mut game = table.build().unwrap();

    game.run_night().await;

    assert_eq!(game.state().alive_players().len(), 9);
    assert_eq!(game.state().night_killed(), None);
    assert!(game.state().can_use_healing_potion());
    assert!(game.state().can_use_poison_potion());
}

#[tokio::test]
async fn test_discussion_ends_on_agreement_at_end_of_round() {
    let table = TestTable::new();
    // Agreement mid-round does not stop the discussion.
    table.agent("Player2").always("discuss", discuss("Kill Player1", true));
    table.agent("Player3").always("discuss", discuss("Fine", true));
    table.agent("Player4").queue("discuss", discuss("Agreed", true));
    let mut game = table.build().unwrap();

    game.run_night().await;

    for wolf in table.wolves() {
        assert_eq!(wolf.calls_for("discuss").len(), 1);
    }
    // The recap shows teammates through the moderator and your own lines as yours.
    let second = &table.agent("Player3").calls_for("discuss")[0];
    assert!(second.prompt.contains("[Previous discussion]"));
    assert!(second.prompt.contains("Moderator: Player2: Kill Player1"));
}

#[tokio::test]
async fn test_discussion_without_agreement_runs_every_turn() {
    let table = TestTable::new();
    for wolf in table.wolves() {
        wolf.always("discuss", discuss("Not sure yet", false));
    }
    let mut game = table.build().unwrap();

    game.run_night().await;

    let max = game.config().max_discussion_rounds as usize;
    for wolf in table.wolves() {
        assert_eq!(wolf.calls_for("discuss").len(), max);
    }
    let last = table.agent("Player2").calls_for("discuss").pop().unwrap();
    assert!(last.prompt.contains("You: Not sure yet"));
}

#[tokio::test]
async fn test_dead_seer_is_skipped() {
    let table = TestTable::new();
    table.agent("Player5").always("check_identity", check("Player2"));
    let mut game = table.build().unwrap();
    game.state().kill_player("Player5");

    game.run_night().await;

    assert!(table.agent("Player5").calls_for("check_identity").is_empty());
}

#[tokio::test]
async fn test_every_wolf_remembers_the_kill() {
    let table = TestTable::new();
    wolves_kill(&table, "Player1");
    let mut game = table.build().unwrap();

    game.run_night().await;

    let book = EnglishPrompts;
    for wolf in ["Player2", "Player3", "Player4"] {
        let prompt = game.memory().augment(wolf, Phase::Day, 1, "Speak.", &book).await;
        assert!(prompt.contains("werewolves chose Player1"), "{wolf} forgot the kill");
    }
    let villager = game.memory().augment("Player8", Phase::Day, 1, "Speak.", &book).await;
    assert!(!villager.contains("werewolves chose"));
}

#[tokio::test]
async fn test_discussion_recap_carries_earlier_nights() {
    let table = TestTable::new();
    wolves_kill(&table, "Player1");
    table.agent("Player2").always("discuss", discuss("Kill Player1", true));
    table.agent("Player3").always("discuss", discuss("Fine", true));
    table.agent("Player4").always("discuss", discuss("Agreed", true));
    let mut game = table.build().unwrap();

    game.run_night().await;
    game.state().set_round(2);
    game.run_night().await;

    let calls = table.agent("Player2").calls_for("discuss");
    assert_eq!(calls.len(), 2);
    // The first speaker of the first night has nothing to recap.
    assert!(!calls[0].prompt.contains("[Previous discussion]"));

    let second_night = &calls[1].prompt;
    assert!(second_night.contains("You: Kill Player1"));
    assert!(second_night.contains("Moderator: Player3: Fine"));
    assert!(second_night.contains("Moderator: [WEREWOLVES ONLY] The voting result is Player1:3"));
}
