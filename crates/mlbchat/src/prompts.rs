//! Prompt builders for the trade analyses.
//!
//! Builders taking a role or a topic return an empty string when they
//! don't know it.

use mlbchat_core::followup::FollowUpScript;

/// System prompt of the connectivity check.
pub const MOTIVATIONAL_SYSTEM_PROMPT: &str = "You are a motivational speaker. \
You travel the country telling audiences how they should live their lives.";

/// Question asked by the connectivity check.
pub const GOOD_LIFE_QUESTION: &str = "How can a person live a good life?";

#[inline]
fn is_general_manager(role: &str) -> bool {
    let role = role.to_lowercase();
    role == "gm" || role == "general manager"
}

/// Builds the most basic question about `topic`, with no context at all.
pub fn brain_dead_prompt(topic: &str, team_name: &str) -> String {
    if topic.eq_ignore_ascii_case("trades") {
        return format!(
            "What trades should the {team_name} make before the deadline?"
        );
    }
    String::new()
}

/// Builds a system prompt that casts the model as `role` of `team_name`.
pub fn role_based_system_prompt(role: &str, team_name: &str) -> String {
    if is_general_manager(role) {
        return format!(
            "You are the General Manager of the {team_name}.  You have been \
             a baseball executive for 25 years.  Prior to that, you were a \
             scout and involved in managing minor league teams.  Your \
             analysis of baseball players and teams is largely based on \
             modern statistical models.  While you are mindful of the \
             payroll, your primary goal is to put a strong roster on the \
             field and keep young talent within the organization."
        );
    }
    String::new()
}

/// Builds a detailed question about `topic` addressed to `role`.
pub fn role_based_prompt(role: &str, topic: &str, team_name: &str) -> String {
    if is_general_manager(role) && topic.eq_ignore_ascii_case("trades") {
        return format!(
            "The trade deadline is coming up in the next few weeks.  Please \
             evaluate the {team_name}.  What are their strengths and \
             weaknesses?  Should they be aggressive in trades?  Please list \
             some candidate trades involving specific players and trade \
             partners that would be appropriate for the team in its current \
             situation."
        );
    }
    String::new()
}

/// Builds the opening prompt of a tool-assisted trade analysis.
pub fn first_step_tool_prompt(team_name: &str) -> String {
    format!(
        "The trade deadline is coming up in the next few weeks.  Please \
         evaluate the {team_name}.  What are their strengths and \
         weaknesses?  Should they be aggressive in trades?  If they are \
         heading for the playoffs, what pieces would be best to focus on?  \
         What areas could be improved for the future?  If they are likely \
         sellers, what positions look like they could get good value back?"
    )
}

/// Builds the first follow-up, asking for concrete trades.
pub fn second_step_tool_prompt(team_name: &str) -> String {
    format!(
        "Based on your analysis so far, please propose some specific trade \
         candidates on the {team_name} and trade targets on other teams. \
         Please verify that the trade targets are currently on the roster of \
         the trade partners that you mention, and that the potential trade \
         would not be rejected by the other team based on common sense."
    )
}

/// Builds the second follow-up, asking for more trade partners.
pub fn third_step_tool_prompt() -> String {
    "Let's keep exploring other potential trade partners.  Please continue \
     to verify that the trade targets are currently on the roster of the \
     trade partners that you mention, and that the potential trade would \
     not be rejected by the other team based on common sense."
        .to_owned()
}

/// The follow-ups appended after each plain-text answer of a
/// tool-assisted trade analysis.
pub fn trade_follow_ups(team_name: &str) -> FollowUpScript {
    FollowUpScript::new([
        second_step_tool_prompt(team_name),
        third_step_tool_prompt(),
    ])
}
