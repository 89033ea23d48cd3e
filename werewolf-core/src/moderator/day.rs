//! Day resolution.
//!
//! Announce the night's deaths, hear first-night last words, stop if the game
//! is already decided, then discuss and vote. A voted-out player speaks last
//! words before dying; a voted-out hunter may shoot.

use super::{unique, Game};
use crate::actions;
use crate::decision::Vote;
use crate::event::GameEvent;
use crate::memory::{detect_accusations, EpisodeKind};
use crate::state::{Phase, Role};
use crate::vote::Tally;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

impl Game {
    /// Run one day. Ends early if the night already decided the game.
    pub async fn run_day(&mut self) {
        let round = self.state.round();
        self.state.set_phase(Phase::Day);
        self.emit(GameEvent::PhaseStarted {
            round,
            phase: Phase::Day,
        });

        let dead = self.announce_deaths().await;

        if self.state.is_first_night() {
            let victim = self.state.night_killed().filter(|_| !self.state.night_saved());
            if let Some(victim) = victim {
                self.last_words(&victim).await;
            }
        }

        if let Some(winner) = self.state.check_winner() {
            debug!(%winner, "game decided at dawn");
            return;
        }

        self.discussion(&dead).await;
        self.day_vote().await;
    }

    /// Tell everyone who died overnight. Returns the dead in announcement order.
    async fn announce_deaths(&mut self) -> Vec<String> {
        let killed = self.state.night_killed().filter(|_| !self.state.night_saved());
        let dead = unique(
            [killed, self.state.night_poisoned(), self.state.night_shot()]
                .into_iter()
                .flatten(),
        );

        let text = if dead.is_empty() {
            self.prompts.peaceful_night()
        } else {
            self.prompts.day_breaks(&dead)
        };
        self.announce(text).await;

        for name in &dead {
            self.remember(EpisodeKind::Death, name, None, format!("{name} died during the night"))
                .await;
        }
        if let Some(target) = self.state.night_shot() {
            let text = self.prompts.hunter_shot(&target);
            self.announce(text).await;
        }
        dead
    }

    async fn discussion(&mut self, last_dead: &[String]) {
        let round = self.state.round();
        let order = self.speaking_order(last_dead).await;
        self.emit(GameEvent::SpeakingOrder(order.clone()));
        let text = self.prompts.discussion_order(&order);
        self.announce(text).await;

        let base = self.prompts.speak_turn();
        for player in &order {
            let prompt = self
                .memory
                .augment(player, Phase::Day, round, &base, self.prompts.as_ref())
                .await;
            let Some(text) = self.dispatcher.speak(player, &prompt).await else {
                continue;
            };

            self.relay(player, &text).await;
            self.remember(EpisodeKind::Speech, player, None, text.clone()).await;
            let alive = self.state.alive_players();
            for accused in detect_accusations(player, &text, &alive) {
                self.remember(EpisodeKind::Accusation, player, Some(&accused), format!("{player} suspects {accused}"))
                    .await;
            }
            self.emit(GameEvent::Speech {
                player: player.clone(),
                text,
            });
        }
    }

    async fn day_vote(&mut self) {
        let round = self.state.round();
        let alive = self.state.alive_players();
        let base = self.prompts.vote_call(&alive);

        let mut prompts = HashMap::new();
        for player in &alive {
            let prompt = self
                .memory
                .augment(player, Phase::Day, round, &base, self.prompts.as_ref())
                .await;
            prompts.insert(player.clone(), prompt);
        }
        let prompts = Arc::new(prompts);
        let candidates = alive.clone();

        let ballots = self
            .dispatcher
            .fan_out(&alive, move |dispatcher, voter| {
                let prompts = Arc::clone(&prompts);
                let candidates = candidates.clone();
                async move {
                    let prompt = prompts.get(&voter)?;
                    dispatcher.decide_as::<Vote>(&voter, prompt, &candidates).await
                }
            })
            .await;

        let mut votes = HashMap::new();
        for (voter, ballot) in ballots {
            let target = ballot.and_then(|b| b.target);
            if target.is_some() {
                match actions::validate_vote(&self.state, &voter, target.as_deref()) {
                    Ok(valid) => {
                        votes.insert(voter.clone(), valid);
                    }
                    Err(err) => self.reject(&voter, "vote", err),
                }
            }
            let counted = votes.get(&voter).cloned();
            let content = match &counted {
                Some(target) => format!("{voter} voted for {target}"),
                None => format!("{voter} abstained"),
            };
            let mut episode = self.memory.episode(round, Phase::Day, EpisodeKind::Vote, &voter, content);
            if let Some(target) = &counted {
                episode = episode.with_target(target);
            }
            self.memory.record(episode).await;
            self.emit(GameEvent::DayVote {
                voter,
                target: counted,
            });
        }

        let tally = Tally::new(&votes);
        let detail = tally.detail();
        let Some(out) = tally.unique_leader().map(str::to_string) else {
            let text = if tally.is_empty() {
                self.prompts.no_votes()
            } else {
                self.prompts.vote_tied(&detail)
            };
            info!(votes = %detail, "nobody voted out");
            self.announce(text).await;
            self.emit(GameEvent::VoteResult {
                detail,
                eliminated: None,
            });
            return;
        };

        info!(player = %out, votes = %detail, "voted out");
        let text = self.prompts.vote_result(&detail, &out);
        self.announce(text).await;
        self.emit(GameEvent::VoteResult {
            detail,
            eliminated: Some(out.clone()),
        });
        self.remember(EpisodeKind::Death, &out, None, format!("{out} was voted out")).await;

        self.last_words(&out).await;
        self.state.kill_player(&out);

        // A poisoned hunter is already dead at night, but never let one shoot.
        let poisoned_tonight = self.state.night_poisoned().as_deref() == Some(out.as_str());
        if self.state.player_role(&out) == Some(Role::Hunter) && !poisoned_tonight {
            if let Some(target) = self.hunter_shoots(&out).await {
                self.state.kill_player(&target);
                let text = self.prompts.hunter_shot(&target);
                self.announce(text).await;
            }
        }
    }
}
