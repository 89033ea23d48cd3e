//! Moderator prompt books.
//!
//! All player-facing text comes from a [`PromptBook`] injected into the game,
//! so the orchestration code never formats a sentence itself.

use crate::state::{Faction, Role};

/// Formatter for every message the moderator sends.
pub trait PromptBook: Send + Sync {
    fn role_name(&self, role: Role) -> &'static str;
    fn faction_name(&self, faction: Faction) -> &'static str;
    fn role_guidance(&self, role: Role) -> &'static str;

    /// First entry in a player's history.
    fn system_instruction(&self, name: &str, role: Role) -> String;

    fn new_game(&self, players: &[String]) -> String;
    fn night_falls(&self) -> String;

    fn wolves_discussion(&self, wolves: &[String], alive: &[String]) -> String;
    fn previous_discussion(&self) -> &'static str;
    fn moderator_label(&self) -> &'static str;
    fn you_label(&self) -> &'static str;
    fn wolves_vote(&self) -> String;
    fn wolves_result(&self, detail: &str, killed: &str) -> String;

    fn witch_turn(&self) -> String;
    fn witch_save(&self, witch: &str, killed: &str) -> String;
    fn witch_saved(&self) -> String;
    fn witch_declined(&self) -> String;
    fn witch_poison(&self, witch: &str) -> String;

    fn seer_turn(&self) -> String;
    fn seer_check(&self, seer: &str) -> String;
    fn seer_result(&self, target: &str, faction: Faction) -> String;

    fn hunter_shoot(&self, hunter: &str) -> String;
    fn hunter_shot(&self, target: &str) -> String;

    fn day_breaks(&self, dead: &[String]) -> String;
    fn peaceful_night(&self) -> String;
    fn last_words(&self, player: &str) -> String;
    fn discussion_order(&self, order: &[String]) -> String;
    fn speak_turn(&self) -> String;
    fn vote_call(&self, alive: &[String]) -> String;
    fn vote_result(&self, detail: &str, voted: &str) -> String;
    fn vote_tied(&self, detail: &str) -> String;
    fn no_votes(&self) -> String;

    fn wolves_win(&self, alive: usize, wolves: usize, roles: &str) -> String;
    fn village_win(&self, roles: &str) -> String;
    fn max_rounds_reached(&self, rounds: u32, roles: &str) -> String;
    fn reflect(&self) -> String;

    fn moderator_instruction(&self) -> String;
    fn speaking_order_request(&self, alive: &[String], round: u32, last_dead: &[String]) -> String;

    fn key_events_heading(&self) -> &'static str;
    fn votes_heading(&self) -> &'static str;
    fn speeches_heading(&self) -> &'static str;
    fn suspects_you(&self, accuser: &str) -> String;
}

/// English prompts.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishPrompts;

/// Chinese prompts, selected with `GAME_LANG=zh`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChinesePrompts;

fn list(names: &[String]) -> String {
    names.join(", ")
}

impl PromptBook for EnglishPrompts {
    fn role_name(&self, role: Role) -> &'static str {
        role.as_str()
    }

    fn faction_name(&self, faction: Faction) -> &'static str {
        match faction {
            Faction::Werewolves => "a werewolf",
            Faction::Villagers => "a good player (villager side)",
        }
    }

    fn role_guidance(&self, role: Role) -> &'static str {
        match role {
            Role::Werewolf => {
                "## WEREWOLF GUIDANCE\n\
                 - The seer is your biggest threat. Find and eliminate them to improve your odds.\n\
                 - On the first night there is no information, so a random choice is common.\n\
                 - Pretending to be another role (seer, witch or villager) is a common way to hide and mislead.\n\
                 - Night results are clues: whether the witch used a potion, whether the dead player was the hunter."
            }
            Role::Villager => {
                "## VILLAGER GUIDANCE\n\
                 - Protecting the special villagers, especially the seer, is crucial for your side.\n\
                 - Werewolves may pretend to be the seer. Stay alert and don't trust anyone easily.\n\
                 - Night results are clues. Use them to find the werewolves."
            }
            Role::Seer => {
                "## SEER GUIDANCE\n\
                 - Revealing yourself too early makes you a werewolf target.\n\
                 - Your checks are the village's best information.\n\
                 - Choose carefully when to reveal your role and share what you found."
            }
            Role::Witch => {
                "## WITCH GUIDANCE\n\
                 - Use your two potions wisely, to protect key villagers or eliminate suspected werewolves.\n\
                 - You cannot save yourself if the werewolves kill you.\n\
                 - You may use at most one potion per night."
            }
            Role::Hunter => {
                "## HUNTER GUIDANCE\n\
                 - Shooting during the day reveals your role, since only the hunter can take a player down.\n\
                 - Your shot activates when you are eliminated, unless the witch poisoned you.\n\
                 - Act like an ordinary villager in discussion to avoid being targeted."
            }
        }
    }

    fn system_instruction(&self, name: &str, role: Role) -> String {
        format!(
            "You're a werewolf game player named {name}.\n\n\
             # YOUR TARGET\n\
             Win the game with your teammates.\n\n\
             # GAME RULES\n\
             - Players are three werewolves, three villagers, one seer, one hunter and one witch.\n\
             - Werewolves kill one player each night and must hide their identity during the day.\n\
             - Villagers have no special ability and try to find and eliminate the werewolves.\n\
             - The seer checks one player's identity each night.\n\
             - The witch has a one-time healing potion and a one-time poison.\n\
             - The hunter can take one player down when eliminated.\n\
             - Night and day alternate until one side wins. Werewolves win once they are at least as many as everyone else.\n\n\
             # YOUR ROLE\n\
             You are a {}.\n{}\n\n\
             # NOTE\n\
             - DO NOT make up information that the moderator or other players did not provide.\n\
             - This is a text-based game.\n\
             - Be specific and concise, give clear reasons.\n\
             - Generate a one-line response and don't repeat others' speeches.",
            self.role_name(role),
            self.role_guidance(role),
        )
    }

    fn new_game(&self, players: &[String]) -> String {
        format!(
            "A new game is starting, the players are: {}. Roles have been randomly assigned and told to each player privately.",
            list(players)
        )
    }

    fn night_falls(&self) -> String {
        "Night has fallen, everyone close your eyes. Werewolves open your eyes and choose a player to eliminate tonight.".to_string()
    }

    fn wolves_discussion(&self, wolves: &[String], alive: &[String]) -> String {
        format!(
            "[WEREWOLVES ONLY] {}, you need to discuss and decide on a player to eliminate tonight. Current alive players are {}.\n\n\
             Discussion points:\n\
             1. Analyze which players might be special roles (seer, witch, hunter)\n\
             2. Consider choosing mid-position players to reduce suspicion\n\
             3. Propose your suggestion with specific reasons\n\
             4. If you agree with teammates, explain why and add strategy tips\n\n\
             Set reach_agreement to true when you reach consensus.",
            list(wolves),
            list(alive)
        )
    }

    fn previous_discussion(&self) -> &'static str {
        "[Previous discussion]"
    }

    fn moderator_label(&self) -> &'static str {
        "Moderator"
    }

    fn you_label(&self) -> &'static str {
        "You"
    }

    fn wolves_vote(&self) -> String {
        "[WEREWOLVES ONLY] Which player do you vote to kill?".to_string()
    }

    fn wolves_result(&self, detail: &str, killed: &str) -> String {
        format!("[WEREWOLVES ONLY] The voting result is {detail}. So you have chosen to eliminate {killed}.")
    }

    fn witch_turn(&self) -> String {
        "Witch's turn, witch open your eyes and decide your action tonight...".to_string()
    }

    fn witch_save(&self, witch: &str, killed: &str) -> String {
        format!(
            "[WITCH ONLY] {witch}, you're the witch, and tonight {killed} is eliminated. \
             You can resurrect them with your healing potion, which can only be used once in the whole game. \
             Do you want to resurrect {killed}? Give me your reason and decision."
        )
    }

    fn witch_saved(&self) -> String {
        "[WITCH ONLY] The witch has chosen to resurrect the player.".to_string()
    }

    fn witch_declined(&self) -> String {
        "[WITCH ONLY] The witch has chosen not to resurrect the player.".to_string()
    }

    fn witch_poison(&self, witch: &str) -> String {
        format!(
            "[WITCH ONLY] {witch}, as the witch you have a one-time-use poison potion. Do you want to use it tonight, and on whom? Give me your reason and decision."
        )
    }

    fn seer_turn(&self) -> String {
        "Seer's turn, seer open your eyes and check one player's identity tonight...".to_string()
    }

    fn seer_check(&self, seer: &str) -> String {
        format!(
            "[SEER ONLY] {seer}, as the seer you can check one player's identity tonight. Who do you want to check? Give me your reason and decision."
        )
    }

    fn seer_result(&self, target: &str, faction: Faction) -> String {
        format!(
            "[SEER ONLY] You've checked {target}, and the result is: {}.",
            self.faction_name(faction)
        )
    }

    fn hunter_shoot(&self, hunter: &str) -> String {
        format!(
            "[HUNTER ONLY] {hunter}, as the hunter you're eliminated. You can choose one player to take down with you, or choose not to use this ability. Give me your reason and decision."
        )
    }

    fn hunter_shot(&self, target: &str) -> String {
        format!("The hunter has chosen to shoot {target} down with them.")
    }

    fn day_breaks(&self, dead: &[String]) -> String {
        format!(
            "The day is coming, all players open your eyes. Last night, the following player(s) have been eliminated: {}.",
            list(dead)
        )
    }

    fn peaceful_night(&self) -> String {
        "The day is coming, all players open your eyes. Last night was peaceful, no player was eliminated.".to_string()
    }

    fn last_words(&self, player: &str) -> String {
        format!(
            "{player}, you're eliminated now. You can make a final statement to all alive players before you leave the game."
        )
    }

    fn discussion_order(&self, order: &[String]) -> String {
        format!(
            "Now the alive players are {}. The game goes on, it's time to discuss and vote a player to be eliminated. Take turns to speak once in the order of {}.",
            list(order),
            list(order)
        )
    }

    fn speak_turn(&self) -> String {
        "It's your turn to speak. Analyze the situation and share your view.".to_string()
    }

    fn vote_call(&self, alive: &[String]) -> String {
        format!(
            "Now the discussion is over. Everyone, please vote to eliminate one player from the alive players: {}.",
            list(alive)
        )
    }

    fn vote_result(&self, detail: &str, voted: &str) -> String {
        format!("The voting result is {detail}. So {voted} has been voted out.")
    }

    fn vote_tied(&self, detail: &str) -> String {
        format!("The voting result is {detail}. The vote is tied, nobody is eliminated today.")
    }

    fn no_votes(&self) -> String {
        "There were no valid votes, nobody is eliminated today.".to_string()
    }

    fn wolves_win(&self, alive: usize, wolves: usize, roles: &str) -> String {
        format!(
            "There are {alive} players alive, and {wolves} of them are werewolves. The game is over and werewolves win! In this game, the true roles of all players are: {roles}"
        )
    }

    fn village_win(&self, roles: &str) -> String {
        format!(
            "All the werewolves have been eliminated. The game is over and villagers win! In this game, the true roles of all players are: {roles}"
        )
    }

    fn max_rounds_reached(&self, rounds: u32, roles: &str) -> String {
        format!(
            "The game has reached {rounds} rounds without a winner and is over. In this game, the true roles of all players are: {roles}"
        )
    }

    fn reflect(&self) -> String {
        "The game is over. Now each player can reflect on their performance. You only have one chance to speak and the reflection is only visible to yourself.".to_string()
    }

    fn moderator_instruction(&self) -> String {
        "You are the moderator of a werewolf game. You never play, you only organize the discussion fairly. Answer with JSON only.".to_string()
    }

    fn speaking_order_request(&self, alive: &[String], round: u32, last_dead: &[String]) -> String {
        let night = if last_dead.is_empty() {
            "Last night was peaceful.".to_string()
        } else {
            format!("Died last night: {}.", list(last_dead))
        };
        format!(
            "Decide the speaking order for this round.\n\n\
             Alive players (seat order): {}\n\
             Current round: {round}\n\
             {night}\n\n\
             Output JSON:\n\
             {{\n  \"start\": \"the first speaker\",\n  \"direction\": \"clockwise or counterclockwise\",\n  \"reason\": \"short reason\"\n}}\n\n\
             Notes:\n\
             - start must be an alive player\n\
             - starting next to a dead player is common",
            list(alive)
        )
    }

    fn key_events_heading(&self) -> &'static str {
        "Key events"
    }

    fn votes_heading(&self) -> &'static str {
        "Votes"
    }

    fn speeches_heading(&self) -> &'static str {
        "Recent speeches"
    }

    fn suspects_you(&self, accuser: &str) -> String {
        format!("{accuser} suspects you")
    }
}

impl PromptBook for ChinesePrompts {
    fn role_name(&self, role: Role) -> &'static str {
        match role {
            Role::Werewolf => "狼人",
            Role::Villager => "村民",
            Role::Seer => "预言家",
            Role::Witch => "女巫",
            Role::Hunter => "猎人",
        }
    }

    fn faction_name(&self, faction: Faction) -> &'static str {
        match faction {
            Faction::Werewolves => "狼人",
            Faction::Villagers => "好人",
        }
    }

    fn role_guidance(&self, role: Role) -> &'static str {
        match role {
            Role::Werewolf => {
                "## 狼人游戏指导\n\
                 - 预言家是你最大的威胁，找出并淘汰他将大大增加获胜机会。\n\
                 - 第一晚没有信息，随机选择是常见的。\n\
                 - 假装成预言家、女巫或村民是隐藏身份的常见策略。\n\
                 - 夜晚的结果提供重要线索，例如女巫是否用药，死者是否是猎人。"
            }
            Role::Villager => {
                "## 村民游戏指导\n\
                 - 保护特殊村民，尤其是预言家，对你方至关重要。\n\
                 - 狼人可能假装成预言家，不要轻易相信任何人。\n\
                 - 夜晚的结果提供重要线索，利用它们识别狼人。"
            }
            Role::Seer => {
                "## 预言家游戏指导\n\
                 - 过早暴露自己可能被狼人盯上。\n\
                 - 你的查验结果对村民至关重要。\n\
                 - 考虑何时揭示身份并分享你的发现。"
            }
            Role::Witch => {
                "## 女巫游戏指导\n\
                 - 明智地使用两瓶药水，保护关键村民或淘汰嫌疑狼人。\n\
                 - 如果你被狼人杀死，你不能救自己。\n\
                 - 每晚最多使用一瓶药水。"
            }
            Role::Hunter => {
                "## 猎人游戏指导\n\
                 - 白天开枪会暴露你的身份。\n\
                 - 你的开枪能力在被淘汰时激活（被女巫毒死除外）。\n\
                 - 讨论中表现得像普通村民，避免被盯上。"
            }
        }
    }

    fn system_instruction(&self, name: &str, role: Role) -> String {
        format!(
            "你是一个狼人杀游戏玩家，名字是 {name}。\n\n\
             # 你的目标\n\
             尽可能与队友一起赢得游戏。\n\n\
             # 游戏规则\n\
             - 玩家分为三个狼人、三个村民、一个预言家、一个猎人和一个女巫。\n\
             - 狼人每晚杀死一名玩家，白天必须隐藏身份。\n\
             - 村民没有特殊能力，尝试识别并淘汰狼人。\n\
             - 预言家每晚可以查验一名玩家的身份。\n\
             - 女巫有一瓶解药和一瓶毒药，各只能使用一次。\n\
             - 猎人被淘汰时可以带走一名玩家。\n\
             - 夜晚和白天交替进行，直到一方获胜。狼人数量不少于其他玩家时狼人获胜。\n\n\
             # 你的角色\n\
             你是{}。\n{}\n\n\
             # 注意\n\
             - 不要编造主持人或其他玩家未提供的信息。\n\
             - 这是一个文字游戏。\n\
             - 回复具体简洁，给出清晰理由。\n\
             - 生成一行回复，不要重复其他人的发言。",
            self.role_name(role),
            self.role_guidance(role),
        )
    }

    fn new_game(&self, players: &[String]) -> String {
        format!(
            "新的一局游戏开始，参与玩家包括：{}。现在为每位玩家随机分配身份，并私下告知各自身份。",
            list(players)
        )
    }

    fn night_falls(&self) -> String {
        "天黑了，请所有人闭眼。狼人请睁眼，选择今晚要淘汰的一名玩家...".to_string()
    }

    fn wolves_discussion(&self, wolves: &[String], alive: &[String]) -> String {
        format!(
            "[仅狼人可见] {}，你们需要讨论并决定今晚要淘汰的玩家。当前存活玩家有：{}。\n\n\
             讨论要点：\n\
             1. 分析哪些玩家可能是特殊角色（预言家、女巫、猎人）\n\
             2. 考虑选择中置位玩家以降低怀疑\n\
             3. 提出你的建议和具体理由\n\
             4. 如果同意队友的建议，说明原因并补充策略\n\n\
             如果达成一致，请将 reach_agreement 设为 true。",
            list(wolves),
            list(alive)
        )
    }

    fn previous_discussion(&self) -> &'static str {
        "[之前的讨论]"
    }

    fn moderator_label(&self) -> &'static str {
        "主持人"
    }

    fn you_label(&self) -> &'static str {
        "你"
    }

    fn wolves_vote(&self) -> String {
        "[仅狼人可见] 你投票要杀死哪位玩家？".to_string()
    }

    fn wolves_result(&self, detail: &str, killed: &str) -> String {
        format!("[仅狼人可见] 投票结果为 {detail}，你们选择淘汰 {killed}。")
    }

    fn witch_turn(&self) -> String {
        "轮到女巫行动，女巫请睁眼并决定今晚的操作...".to_string()
    }

    fn witch_save(&self, witch: &str, killed: &str) -> String {
        format!(
            "[仅女巫可见] {witch}，你是女巫，今晚{killed}被淘汰。你可以用解药救他/她，解药全局只能用一次。你要救{killed}吗？请给出理由和决定。"
        )
    }

    fn witch_saved(&self) -> String {
        "[仅女巫可见] 女巫选择救活该玩家。".to_string()
    }

    fn witch_declined(&self) -> String {
        "[仅女巫可见] 女巫选择不救该玩家。".to_string()
    }

    fn witch_poison(&self, witch: &str) -> String {
        format!("[仅女巫可见] {witch}，你有一瓶一次性毒药，今晚要使用吗？对谁使用？请给出理由和决定。")
    }

    fn seer_turn(&self) -> String {
        "轮到预言家行动，预言家请睁眼并查验一名玩家身份...".to_string()
    }

    fn seer_check(&self, seer: &str) -> String {
        format!("[仅预言家可见] {seer}，你是预言家，今晚可以查验一名玩家身份。你要查谁？请给出理由和决定。")
    }

    fn seer_result(&self, target: &str, faction: Faction) -> String {
        format!(
            "[仅预言家可见] 你查验了{target}，结果是：{}。",
            self.faction_name(faction)
        )
    }

    fn hunter_shoot(&self, hunter: &str) -> String {
        format!("[仅猎人可见] {hunter}，你是猎人，你已被淘汰。你可以选择带走一名玩家，也可以选择不带走。请给出理由和决定。")
    }

    fn hunter_shot(&self, target: &str) -> String {
        format!("猎人选择带走 {target} 一起出局。")
    }

    fn day_breaks(&self, dead: &[String]) -> String {
        format!("天亮了，请所有玩家睁眼。昨晚被淘汰的玩家有：{}。", list(dead))
    }

    fn peaceful_night(&self) -> String {
        "天亮了，请所有玩家睁眼。昨晚平安夜，无人被淘汰。".to_string()
    }

    fn last_words(&self, player: &str) -> String {
        format!("{player}，你已被淘汰。现在你可以向所有存活玩家发表最后的遗言。")
    }

    fn discussion_order(&self, order: &[String]) -> String {
        format!(
            "现在存活玩家有：{}。游戏继续，大家开始讨论并投票淘汰一名玩家。请按顺序（{}）依次发言。",
            list(order),
            list(order)
        )
    }

    fn speak_turn(&self) -> String {
        "轮到你发言了，请分析局势并表达你的观点。".to_string()
    }

    fn vote_call(&self, alive: &[String]) -> String {
        format!("讨论结束。请大家从存活玩家中投票淘汰一人：{}。", list(alive))
    }

    fn vote_result(&self, detail: &str, voted: &str) -> String {
        format!("投票结果为 {detail}，{voted} 被淘汰。")
    }

    fn vote_tied(&self, detail: &str) -> String {
        format!("投票结果为 {detail}，出现平票，今天无人被淘汰。")
    }

    fn no_votes(&self) -> String {
        "没有有效投票，今天无人被淘汰。".to_string()
    }

    fn wolves_win(&self, alive: usize, wolves: usize, roles: &str) -> String {
        format!("当前存活玩家共{alive}人，其中{wolves}人为狼人。游戏结束，狼人获胜！本局所有玩家真实身份为：{roles}")
    }

    fn village_win(&self, roles: &str) -> String {
        format!("所有狼人已被淘汰。游戏结束，村民获胜！本局所有玩家真实身份为：{roles}")
    }

    fn max_rounds_reached(&self, rounds: u32, roles: &str) -> String {
        format!("游戏已进行{rounds}轮仍未分出胜负，游戏结束。本局所有玩家真实身份为：{roles}")
    }

    fn reflect(&self) -> String {
        "游戏结束。现在每位玩家可以对自己的表现进行反思。每位玩家只有一次发言机会，且反思内容仅自己可见。".to_string()
    }

    fn moderator_instruction(&self) -> String {
        "你是狼人杀主持人，不参与游戏，只负责公平地组织讨论。只输出 JSON。".to_string()
    }

    fn speaking_order_request(&self, alive: &[String], round: u32, last_dead: &[String]) -> String {
        let night = if last_dead.is_empty() {
            "昨晚是平安夜".to_string()
        } else {
            format!("昨晚死亡: {}", list(last_dead))
        };
        format!(
            "请决定本轮发言顺序。\n\n\
             存活玩家（按座位顺序）: {}\n\
             当前回合: {round}\n\
             {night}\n\n\
             输出 JSON 格式:\n\
             {{\n  \"start\": \"从哪个玩家开始发言\",\n  \"direction\": \"clockwise 或 counterclockwise\",\n  \"reason\": \"简短说明决策原因\"\n}}\n\n\
             注意：\n\
             - start 必须是存活玩家之一\n\
             - 可以考虑从死者旁边的玩家开始",
            list(alive)
        )
    }

    fn key_events_heading(&self) -> &'static str {
        "关键事件"
    }

    fn votes_heading(&self) -> &'static str {
        "投票记录"
    }

    fn speeches_heading(&self) -> &'static str {
        "近期发言"
    }

    fn suspects_you(&self, accuser: &str) -> String {
        format!("{accuser} 怀疑你")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_names_role() {
        let text = EnglishPrompts.system_instruction("Player3", Role::Witch);
        assert!(text.contains("Player3"));
        assert!(text.contains("You are a witch."));
        assert!(text.contains("WITCH GUIDANCE"));

        let text = ChinesePrompts.system_instruction("Player3", Role::Seer);
        assert!(text.contains("你是预言家"));
    }

    #[test]
    fn test_seer_result_reveals_faction_only() {
        let text = EnglishPrompts.seer_result("Player2", Faction::Werewolves);
        assert!(text.contains("Player2"));
        assert!(text.contains("werewolf"));
    }
}
