//! Validated game actions.
//!
//! Every night action and vote passes through one of these functions before it
//! touches [`GameState`]. A rejected action returns an [`ActionError`] and
//! leaves the state exactly as it was.

use crate::error::{ActionError, ActionResult};
use crate::state::{Faction, GameState, Role};

/// Target must be a seated, living player other than the actor.
pub fn validate_target(state: &GameState, actor: &str, target: Option<&str>) -> ActionResult<String> {
    let target = target.filter(|t| !t.is_empty()).ok_or(ActionError::NoTarget)?;
    if !state.is_player(target) {
        return Err(ActionError::UnknownPlayer(target.to_string()));
    }
    if !state.is_alive(target) {
        return Err(ActionError::NotAlive(target.to_string()));
    }
    if target == actor {
        return Err(ActionError::SelfTarget(target.to_string()));
    }
    Ok(target.to_string())
}

/// A werewolf's kill vote: any living non-werewolf.
pub fn validate_kill(state: &GameState, wolf: &str, target: Option<&str>) -> ActionResult<String> {
    let target = validate_target(state, wolf, target)?;
    if state.player_role(&target).is_some_and(Role::is_werewolf) {
        return Err(ActionError::FriendlyFire(target));
    }
    Ok(target)
}

/// A day vote. Self-votes are rejected.
pub fn validate_vote(state: &GameState, voter: &str, target: Option<&str>) -> ActionResult<String> {
    validate_target(state, voter, target)
}

fn require_role(state: &GameState, actor: &str, role: Role) -> ActionResult<()> {
    if state.player_role(actor) == Some(role) && state.is_alive(actor) {
        Ok(())
    } else {
        Err(ActionError::WrongRole {
            actor: actor.to_string(),
            role: role.as_str(),
        })
    }
}

/// Use the healing potion on tonight's werewolf victim. Returns the saved name.
pub fn apply_save(state: &GameState, witch: &str) -> ActionResult<String> {
    require_role(state, witch, Role::Witch)?;
    if !state.can_use_healing_potion() {
        return Err(ActionError::HealUsed);
    }
    let killed = state.night_killed().ok_or(ActionError::NothingToSave)?;
    if killed == witch {
        return Err(ActionError::WitchSelfSave);
    }
    state.set_night_saved(true);
    Ok(killed)
}

/// Use the poison potion. Only one potion may be used per night.
pub fn apply_poison(state: &GameState, witch: &str, target: Option<&str>) -> ActionResult<String> {
    require_role(state, witch, Role::Witch)?;
    if !state.can_use_poison_potion() {
        return Err(ActionError::PoisonUsed);
    }
    if state.night_saved() {
        return Err(ActionError::PotionAlreadyUsedTonight);
    }
    let target = validate_target(state, witch, target)?;
    state.set_night_poisoned(Some(target.clone()));
    Ok(target)
}

/// The seer learns the target's faction.
pub fn check_identity(state: &GameState, seer: &str, target: Option<&str>) -> ActionResult<(String, Faction)> {
    require_role(state, seer, Role::Seer)?;
    let target = validate_target(state, seer, target)?;
    let faction = state
        .player_role(&target)
        .map(Role::faction)
        .ok_or_else(|| ActionError::UnknownPlayer(target.clone()))?;
    Ok((target, faction))
}

/// The hunter's parting shot.
///
/// The hunter is usually already condemned when this is called, so only the
/// role is checked, not whether they are alive. At night the shot cannot be
/// spent on tonight's poison victim, who is dying anyway.
pub fn validate_shot(state: &GameState, hunter: &str, target: Option<&str>) -> ActionResult<String> {
    if state.player_role(hunter) != Some(Role::Hunter) {
        return Err(ActionError::WrongRole {
            actor: hunter.to_string(),
            role: Role::Hunter.as_str(),
        });
    }
    let target = validate_target(state, hunter, target)?;
    if state.night_poisoned().as_deref() == Some(target.as_str()) {
        return Err(ActionError::AlreadyDoomed(target));
    }
    Ok(target)
}
