//! Node prompt templates
//!
//! One template per pipeline node, rendered by plain placeholder
//! substitution. Every structured node states its JSON output contract
//! inline so the response can be parsed without a separate schema exchange.

/// Substitute `{name}` placeholders in a template.
///
/// Only the listed placeholders are replaced; JSON braces in the template
/// body pass through untouched.
fn render(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in substitutions {
        out = out.replace(&format!("{{{}}}", name), value);
    }
    out
}

pub const INTENT_PROMPT: &str = r#"# Instruction
You are the intent classifier for a robot task-planning agent.
Classify the user's latest message into exactly one of these intents:
- "task": a command the robot should plan and execute, e.g. "put the red block in the bowl".
- "question": a question about the environment, the objects, or what the robot can do.
- "smalltalk": social chatter with no actionable content.

Rules:
- Judge only the latest message; do not invent tasks the user did not ask for.
- An imperative sentence addressed to the robot is a task even when phrased politely.
- When in doubt between task and question, prefer question.

# Input
<user_query>
{user_query}
</user_query>

# Output Format
Return only a JSON object:
{"intent": "task" | "question" | "smalltalk", "rationale": "one short sentence"}
"#;

pub fn render_intent(user_query: &str) -> String {
    render(INTENT_PROMPT, &[("user_query", user_query)])
}

pub const SUPERVISOR_PROMPT: &str = r#"# Instruction
You are the feasibility supervisor for a robot task-planning agent.
Decide whether the commanded task can be completed with the robot's built-in
skills and the objects actually present in the scene.

Rules:
- Use only the skills listed in <skill_text>; the robot has no others.
- Use only the objects listed in <object_text>; do not assume objects exist.
- A task is infeasible when it needs an object that is not present, or an
  ability (opening, pouring, cutting, speaking, ...) no skill provides.
- Judge feasibility, not difficulty: a long but achievable task is feasible.

# Input
1. robot_skills
<skill_text>
{skill_text}
</skill_text>

2. observation
<object_text>
{object_text}
</object_text>

3. command
<user_query>
{user_query}
</user_query>

# Output Format
Return only a JSON object:
{"feasible": true | false, "reason": "one or two sentences"}
"#;

pub fn render_supervisor(skill_text: &str, object_text: &str, user_query: &str) -> String {
    render(
        SUPERVISOR_PROMPT,
        &[
            ("skill_text", skill_text),
            ("object_text", object_text),
            ("user_query", user_query),
        ],
    )
}

pub const FEEDBACK_PROMPT: &str = r#"# Instruction
You are the feedback generator for a robot task-planning agent.
The feasibility supervisor rejected the user's command. Explain the rejection
to the user and, when a close achievable alternative exists, propose a revised
command.

Rules:
- The explanation must name the missing object or capability concretely.
- Propose a revised command only when it preserves the user's evident goal
  and is achievable with the listed skills and objects. Otherwise set
  "revised_query" to null.
- The revised command must be phrased as the user would phrase it, not as a
  plan.

# Input
1. robot_skills
<skill_text>
{skill_text}
</skill_text>

2. observation
<object_text>
{object_text}
</object_text>

3. rejected command
<user_query>
{user_query}
</user_query>

4. rejection reason
<reason>
{reason}
</reason>

# Output Format
Return only a JSON object:
{"explanation": "...", "revised_query": "..." | null}
"#;

pub fn render_feedback(
    skill_text: &str,
    object_text: &str,
    user_query: &str,
    reason: &str,
) -> String {
    render(
        FEEDBACK_PROMPT,
        &[
            ("skill_text", skill_text),
            ("object_text", object_text),
            ("user_query", user_query),
            ("reason", reason),
        ],
    )
}

pub const QUESTION_ANSWER_PROMPT: &str = r#"# Instruction
You are the question answerer for a robot task-planning agent.
Answer the user's question using only what the observation and the skill list
actually show.

Rules:
- Ground every claim in <object_text> or <skill_text>; never invent objects
  or abilities.
- When the question cannot be answered from the observation, say so plainly.
- Answer in a short paragraph of natural language, no JSON.

# Input
1. robot_skills
<skill_text>
{skill_text}
</skill_text>

2. observation
<object_text>
{object_text}
</object_text>

3. question
<user_query>
{user_query}
</user_query>
"#;

pub fn render_question_answer(skill_text: &str, object_text: &str, user_query: &str) -> String {
    render(
        QUESTION_ANSWER_PROMPT,
        &[
            ("skill_text", skill_text),
            ("object_text", object_text),
            ("user_query", user_query),
        ],
    )
}

pub const GOAL_DECOMP_PROMPT: &str = r#"# Instruction
You are the goal-level planner for a robot task-planning agent.
Your job is to decompose the user's command into independent high-level subgoals.

Definition of Terms:
- High-level goal: A distinct objective expressed without describing detailed actions.
- Attribute-based decomposition: Splitting goals based on shared attributes of objects such as color, size, or shape.
- Semantic grouping: Grouping by meaning or shared properties rather than by grammatical structure.

General Rules:
- Each subgoal must represent one independent, meaningful objective.
- If the user input contains multiple intentions, split them by meaning.
- Do not describe movement, manipulation steps, or low-level actions. These will be handled later.
- Keep each subgoal short, natural, and faithful to the original meaning.
- Preserve the user query's order.

Attribute-Based Rules:
- If the user's command involves categorizing, sorting, grouping, matching, or organizing objects based on attributes, then you must apply attribute-based decomposition.
- Extract object attributes from object_text. For example: "object_red_0" has the attribute "red".
- Detect attribute groups (such as colors) from the object_text and match objects to bowls with the same attribute.
- When attribute-based organization is required, the number of subgoals must match the number of attribute groups.

Example:
User input:
Organize the objects to the bowls according to their colors

Given object_text:
{
    "object_name": "object_red_0",
    "object_name": "object_yellow_0",
    "object_name": "object_yellow_1",
    "object_name": "object_red_bowl_0",
    "object_name": "object_yellow_bowl_7",
}

Output:
{"subgoals": [
    "Organize the red objects to the red bowls",
    "Organize the yellow objects to the yellow bowls"
]}

# Input
<object_text>
{object_text}
</object_text>
<user_query>
{user_query}
</user_query>

# Output Format
Return only a JSON object:
{"subgoals": ["...", "..."]}
"#;

pub fn render_goal_decomp(object_text: &str, user_query: &str) -> String {
    render(
        GOAL_DECOMP_PROMPT,
        &[("object_text", object_text), ("user_query", user_query)],
    )
}

pub const TASK_DECOMP_PROMPT: &str = r#"# Role
You are the task-level planner for a robot task-planning agent.
Your job is to convert each high-level subgoal into an ordered sequence of semantic tasks that the robot can perform using its built-in skills.

Definition of Terms:
- Semantic task: A meaningful, minimal operation that contributes directly toward completing a subgoal.
- Skill: A predefined robot capability such as moving to an object, picking an object, or placing an object.
- Target: The object or location to which a skill is applied.

# Task-Level Principles
1. You must interpret the subgoal as a high-level objective that is already attribute-grouped by the goal-level planner.
2. Your output must be a sequence of semantic tasks that use the robot's built-in skills.
3. Do not add new interpretations beyond the subgoal.
4. Do not infer colors, groups, or attributes beyond what is explicitly present in the subgoal or object_text.
5. Do not describe low-level motion details. You must only specify which skill is used and which object is targeted.

# Required Behavior
- Use only the skills listed in <skill_text>.
- Select objects only from <object_text>.
- You may ignore objects that are not relevant to the subgoal.
- The task steps must be short, natural, logically ordered, and directly connected to the subgoal.
- Each task step must include:
  - the skill name,
  - the target object or target location.

# Process
1. Analyze the subgoal.
2. Identify relevant objects in <object_text> that appear in or logically correspond to the subgoal.
3. Convert the subgoal into a sequential list of semantic tasks using robot skills.
4. Ensure that the sequence achieves the subgoal without unnecessary steps.

# Few-Shot Example
Input:
<skill_text>
from robot1.skills import GoToObject, PickObject, PlaceObject
</skill_text>

<object_text>
{
    "object_name": "object_red_0",
    "object_name": "object_yellow_0",
    "object_name": "object_yellow_1",
    "object_name": "object_red_bowl_0",
    "object_name": "object_yellow_bowl_7",
}
</object_text>

<subgoals_text>
[
    "Organize the red objects to the red bowls",
    "Organize the yellow objects to the yellow bowls"
]
</subgoals_text>

Output:
{"task_outputs": [
    {
        "subgoal": "Organize the red objects to the red bowls",
        "tasks": [
            {"skill": "GoToObject", "target": "object_red_0"},
            {"skill": "PickObject", "target": "object_red_0"},
            {"skill": "GoToObject", "target": "object_red_bowl_0"},
            {"skill": "PlaceObject", "target": "object_red_bowl_0"}
        ]
    },
    {
        "subgoal": "Organize the yellow objects to the yellow bowls",
        "tasks": [
            {"skill": "GoToObject", "target": "object_yellow_0"},
            {"skill": "PickObject", "target": "object_yellow_0"},
            {"skill": "GoToObject", "target": "object_yellow_bowl_7"},
            {"skill": "PlaceObject", "target": "object_yellow_bowl_7"},
            {"skill": "GoToObject", "target": "object_yellow_1"},
            {"skill": "PickObject", "target": "object_yellow_1"},
            {"skill": "GoToObject", "target": "object_yellow_bowl_7"},
            {"skill": "PlaceObject", "target": "object_yellow_bowl_7"}
        ]
    }
]}

# Input Components
1. robot_skills
<skill_text>
{skill_text}
</skill_text>

2. observation
<object_text>
{object_text}
</object_text>

3. subgoals
<subgoals_text>
{subgoals_text}
</subgoals_text>

# Output Format
Return only a JSON object:
{"task_outputs": [{"subgoal": "...", "tasks": [{"skill": "...", "target": "..."}]}]}
"#;

pub fn render_task_decomp(skill_text: &str, object_text: &str, subgoals_text: &str) -> String {
    render(
        TASK_DECOMP_PROMPT,
        &[
            ("skill_text", skill_text),
            ("object_text", object_text),
            ("subgoals_text", subgoals_text),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_placeholders() {
        let rendered = render_intent("put the block in the bowl");
        assert!(rendered.contains("<user_query>\nput the block in the bowl\n</user_query>"));
        assert!(!rendered.contains("{user_query}"));
    }

    #[test]
    fn test_render_preserves_json_braces() {
        let rendered = render_intent("x");
        // The output-format example braces must survive rendering
        assert!(rendered.contains(r#"{"intent": "task" | "question" | "smalltalk""#));
    }

    #[test]
    fn test_render_goal_decomp() {
        let rendered = render_goal_decomp("{\n}", "sort the blocks");
        assert!(rendered.contains("<object_text>\n{\n}\n</object_text>"));
        assert!(rendered.contains("sort the blocks"));
        // The few-shot example stays intact
        assert!(rendered.contains("Organize the red objects to the red bowls"));
    }

    #[test]
    fn test_render_task_decomp_all_inputs() {
        let rendered = render_task_decomp(
            "from robot1.skills import PickObject",
            "{\n    \"object_name\": \"object_a\",\n}",
            "[\nmove object_a\n]",
        );
        assert!(rendered.contains("from robot1.skills import PickObject"));
        assert!(rendered.contains("object_a"));
        assert!(rendered.contains("[\nmove object_a\n]"));
        assert!(!rendered.contains("{skill_text}"));
        assert!(!rendered.contains("{object_text}"));
        assert!(!rendered.contains("{subgoals_text}"));
    }

    #[test]
    fn test_render_feedback_includes_reason() {
        let rendered = render_feedback("skills", "objects", "command", "no blue bowl present");
        assert!(rendered.contains("<reason>\nno blue bowl present\n</reason>"));
    }
}
