//! Night resolution.
//!
//! Steps run in a fixed order and never go back:
//! reset, werewolf discussion, werewolf vote, witch save, witch poison,
//! seer check, resolve. Any step whose actor fails to answer is skipped.

use super::Game;
use crate::actions;
use crate::decision::{Check, Discuss, Poison, Save, Vote};
use crate::event::GameEvent;
use crate::memory::EpisodeKind;
use crate::message::truncate;
use crate::state::Phase;
use crate::vote::Tally;
use std::collections::HashMap;
use tracing::{debug, info};

/// Characters kept per line of the werewolves' discussion recap.
const RECAP_LINE_CHARS: usize = 100;

/// One line on the werewolves' private channel. `speaker` is `None` for the
/// moderator's own notes, such as the vote result.
#[derive(Debug, Clone)]
pub(super) struct ChannelLine {
    speaker: Option<String>,
    text: String,
}

impl Game {
    /// Run one night and apply its deaths.
    pub async fn run_night(&mut self) {
        let round = self.state.round();
        self.state.reset_night_state();
        self.state.set_phase(Phase::Night);
        self.emit(GameEvent::PhaseStarted {
            round,
            phase: Phase::Night,
        });
        let text = self.prompts.night_falls();
        self.announce(text).await;

        self.werewolf_discussion().await;
        self.werewolf_vote().await;
        self.witch_save().await;
        self.witch_poison().await;
        self.seer_check().await;
        self.resolve_night().await;
    }

    async fn werewolf_discussion(&mut self) {
        let wolves = self.state.alive_werewolves();
        if wolves.is_empty() || self.config.max_discussion_rounds == 0 {
            return;
        }
        let alive = self.state.alive_players();
        let base = self.prompts.wolves_discussion(&wolves, &alive);
        self.emit(GameEvent::WerewolfDiscussionStarted {
            wolves: wolves.clone(),
        });

        let pack = wolves.len();
        let turns = self.config.max_discussion_rounds as usize * pack;

        for turn in 0..turns {
            let wolf = &wolves[turn % pack];
            let prompt = self.discussion_prompt(wolf, &base);
            let Some(speech) = self.dispatcher.decide_as::<Discuss>(wolf, &prompt, &alive).await else {
                continue;
            };

            let others: Vec<String> = wolves.iter().filter(|w| *w != wolf).cloned().collect();
            self.dispatcher
                .broadcast(&others, &format!("{wolf}: {}", speech.message))
                .await;
            self.emit(GameEvent::WerewolfSpeech {
                wolf: wolf.clone(),
                turn: turn as u32 + 1,
                message: speech.message.clone(),
                agreed: speech.reach_agreement,
            });
            self.wolf_channel.push(ChannelLine {
                speaker: Some(wolf.clone()),
                text: speech.message,
            });

            // Agreement only ends the discussion on the last turn of a full round.
            if (turn + 1) % pack == 0 && speech.reach_agreement {
                debug!(turn = turn + 1, "werewolves reached agreement");
                break;
            }
        }
    }

    /// The discussion prompt plus a recap of the werewolf channel so far, every
    /// night included, as `wolf` saw it.
    fn discussion_prompt(&self, wolf: &str, base: &str) -> String {
        if self.wolf_channel.is_empty() {
            return base.to_string();
        }
        let moderator = self.prompts.moderator_label();
        let recap: Vec<String> = self
            .wolf_channel
            .iter()
            .map(|line| match line.speaker.as_deref() {
                Some(speaker) if speaker == wolf => {
                    format!("{}: {}", self.prompts.you_label(), truncate(&line.text, RECAP_LINE_CHARS))
                }
                Some(speaker) => format!(
                    "{moderator}: {}",
                    truncate(&format!("{speaker}: {}", line.text), RECAP_LINE_CHARS)
                ),
                None => format!("{moderator}: {}", truncate(&line.text, RECAP_LINE_CHARS)),
            })
            .collect();
        format!("{base}\n\n{}\n{}", self.prompts.previous_discussion(), recap.join("\n"))
    }

    async fn werewolf_vote(&mut self) {
        let wolves = self.state.alive_werewolves();
        if wolves.is_empty() {
            return;
        }
        let alive = self.state.alive_players();
        let prompt = self.prompts.wolves_vote();
        let ballots = self
            .dispatcher
            .fan_out_decisions::<Vote>(&wolves, &prompt, &alive)
            .await;

        let mut votes = HashMap::new();
        for (wolf, ballot) in ballots {
            let target = ballot.and_then(|b| b.target);
            if target.is_some() {
                match actions::validate_kill(&self.state, &wolf, target.as_deref()) {
                    Ok(valid) => {
                        votes.insert(wolf.clone(), valid);
                    }
                    Err(err) => self.reject(&wolf, "kill vote", err),
                }
            }
            self.emit(GameEvent::WerewolfVote {
                target: votes.get(&wolf).cloned(),
                wolf,
            });
        }

        let tally = Tally::new(&votes);
        let killed = tally.leader().map(str::to_string);
        let detail = tally.detail();
        self.state.set_night_killed(killed.clone());

        if let Some(victim) = &killed {
            info!(victim = %victim, votes = %detail, "werewolves chose a victim");
            let result = self.prompts.wolves_result(&detail, victim);
            self.dispatcher.broadcast(&wolves, &result).await;
            self.wolf_channel.push(ChannelLine {
                speaker: None,
                text: result,
            });
            // Kill episodes are private, so each wolf keeps its own copy.
            for wolf in &wolves {
                self.remember(EpisodeKind::Kill, wolf, Some(victim), format!("werewolves chose {victim} ({detail})"))
                    .await;
            }
        } else {
            info!("werewolves chose nobody");
        }
        self.emit(GameEvent::WerewolfKill { target: killed, detail });
    }

    /// The living witch, if the table has one.
    fn living_witch(&self) -> Option<String> {
        self.state.witch().filter(|w| self.state.is_alive(w))
    }

    async fn witch_save(&mut self) {
        if self.state.witch().is_none() {
            return;
        }
        let text = self.prompts.witch_turn();
        self.announce(text).await;

        let Some(witch) = self.living_witch() else {
            return;
        };
        let Some(killed) = self.state.night_killed() else {
            return;
        };
        if !self.state.can_use_healing_potion() || killed == witch {
            return;
        }

        let prompt = self.prompts.witch_save(&witch, &killed);
        let wants_save = self
            .dispatcher
            .decide_as::<Save>(&witch, &prompt, &[])
            .await
            .is_some_and(|d| d.save);
        if !wants_save {
            self.dispatcher.tell(&witch, &self.prompts.witch_declined()).await;
            return;
        }

        match actions::apply_save(&self.state, &witch) {
            Ok(saved) => {
                info!(witch = %witch, saved = %saved, "witch used the healing potion");
                self.dispatcher.tell(&witch, &self.prompts.witch_saved()).await;
                self.remember(EpisodeKind::Save, &witch, Some(&saved), format!("{witch} saved {saved}"))
                    .await;
                self.emit(GameEvent::WitchSave { witch, target: saved });
            }
            Err(err) => self.reject(&witch, "save", err),
        }
    }

    async fn witch_poison(&mut self) {
        let Some(witch) = self.living_witch() else {
            return;
        };
        // One potion per night.
        if !self.state.can_use_poison_potion() || self.state.night_saved() {
            return;
        }

        let candidates: Vec<String> = self
            .state
            .alive_players()
            .into_iter()
            .filter(|p| *p != witch)
            .collect();
        let prompt = self.prompts.witch_poison(&witch);
        let Some(decision) = self
            .dispatcher
            .decide_as::<Poison>(&witch, &prompt, &candidates)
            .await
        else {
            return;
        };
        if !decision.poison {
            debug!(witch = %witch, "witch keeps the poison");
            return;
        }

        match actions::apply_poison(&self.state, &witch, decision.target.as_deref()) {
            Ok(target) => {
                info!(witch = %witch, target = %target, "witch used the poison");
                self.remember(EpisodeKind::Poison, &witch, Some(&target), format!("{witch} poisoned {target}"))
                    .await;
                self.emit(GameEvent::WitchPoison { witch, target });
            }
            Err(err) => self.reject(&witch, "poison", err),
        }
    }

    async fn seer_check(&mut self) {
        if self.state.seer().is_none() {
            return;
        }
        let text = self.prompts.seer_turn();
        self.announce(text).await;

        let Some(seer) = self.state.seer().filter(|s| self.state.is_alive(s)) else {
            return;
        };
        let candidates: Vec<String> = self
            .state
            .alive_players()
            .into_iter()
            .filter(|p| *p != seer)
            .collect();
        let prompt = self.prompts.seer_check(&seer);
        let Some(decision) = self
            .dispatcher
            .decide_as::<Check>(&seer, &prompt, &candidates)
            .await
        else {
            return;
        };

        match actions::check_identity(&self.state, &seer, decision.target.as_deref()) {
            Ok((target, faction)) => {
                info!(seer = %seer, target = %target, %faction, "seer checked a player");
                // Told to the seer alone.
                self.dispatcher
                    .tell(&seer, &self.prompts.seer_result(&target, faction))
                    .await;
                self.remember(EpisodeKind::Check, &seer, Some(&target), format!("{target} is {faction}"))
                    .await;
                self.emit(GameEvent::SeerCheck { seer, target, faction });
            }
            Err(err) => self.reject(&seer, "check", err),
        }
    }

    /// Turn tonight's pending actions into deaths.
    ///
    /// A hunter killed by the werewolves, and not poisoned, shoots before
    /// dying. Poisoned hunters never shoot.
    async fn resolve_night(&mut self) {
        let killed = self.state.night_killed().filter(|_| !self.state.night_saved());
        let poisoned = self.state.night_poisoned();

        if let (Some(victim), Some(hunter)) = (&killed, self.state.hunter()) {
            if *victim == hunter && poisoned.as_deref() != Some(hunter.as_str()) && self.state.is_alive(&hunter) {
                let shot = self.hunter_shoots(&hunter).await;
                self.state.set_night_shot(shot);
            }
        }
        let shot = self.state.night_shot();

        for name in [&killed, &shot, &poisoned].into_iter().flatten() {
            if self.state.kill_player(name) {
                info!(player = %name, "died during the night");
            }
        }

        self.emit(GameEvent::NightSummary {
            killed: self.state.night_killed(),
            saved: self.state.night_saved(),
            poisoned,
            shot,
        });
    }
}
