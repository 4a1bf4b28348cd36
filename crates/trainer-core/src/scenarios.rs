//! Scenarios shipped with the trainer.

use contracts::{Difficulty, Phase, Scenario, ScenarioOption, ScenarioStep, SOLO_SCENARIO_ID};

fn step(
    id: &str,
    phase: Phase,
    prompt: &str,
    time_limit: Option<u32>,
    options: Vec<ScenarioOption>,
) -> ScenarioStep {
    ScenarioStep {
        id: id.to_string(),
        phase,
        prompt: prompt.to_string(),
        time_limit,
        options,
    }
}

fn opt(text: &str, score: u32, feedback: &str) -> ScenarioOption {
    ScenarioOption::new(text, score, feedback)
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|tag| tag.to_string()).collect()
}

pub fn builtin_scenarios() -> Vec<Scenario> {
    vec![ooda_loop_trainer(), crowd_at_the_gate(), lost_radio_contact()]
}

fn ooda_loop_trainer() -> Scenario {
    Scenario {
        id: SOLO_SCENARIO_ID.to_string(),
        title: "OODA Loop Decision Trainer".to_string(),
        summary: "Walk through Observe, Orient, Decide, and Act in a developing security situation."
            .to_string(),
        tags: tags(&["OODA", "decision-making", "cognitive"]),
        difficulty: Difficulty::Beginner,
        steps: vec![
            step(
                "observe",
                Phase::Observe,
                "You're monitoring an entry area. You notice raised voices and a small crowd forming near a side door. What do you focus on first?",
                Some(20),
                vec![
                    opt(
                        "Who is involved, where they are, and potential escape routes.",
                        100,
                        "Good observation: people, positions, and exits help you understand risk.",
                    ),
                    opt(
                        "Only the loudest person and ignore surroundings.",
                        40,
                        "You picked up on one element, but missed context and environment.",
                    ),
                    opt(
                        "Nothing yet; you assume it's normal chatter.",
                        10,
                        "That risks missing early indicators and losing initiative.",
                    ),
                ],
            ),
            step(
                "orient",
                Phase::Orient,
                "You see one agitated person and others backing away. No obvious weapons. What's your initial orientation?",
                Some(20),
                vec![
                    opt(
                        "Treat it as a potential risk, but prioritize distance and de-escalation.",
                        100,
                        "Balanced orientation: possible risk, but not automatically a lethal threat.",
                    ),
                    opt(
                        "Assume the person is harmless until proven otherwise.",
                        40,
                        "You're under-weighting risk; better to respect early warning signs.",
                    ),
                    opt(
                        "Assume the worst and prepare for maximum force immediately.",
                        20,
                        "This over-escalates before you have enough information.",
                    ),
                ],
            ),
            step(
                "decide",
                Phase::Decide,
                "You can safely keep some distance, have radio contact available, and there are bystanders around. What's your decision?",
                Some(20),
                vec![
                    opt(
                        "Create space, notify your team/dispatch, and begin calm verbal engagement.",
                        100,
                        "Strong choice: communication + backup + distance keeps options open.",
                    ),
                    opt(
                        "Move in very close and confront the person loudly.",
                        30,
                        "Closes distance and may escalate tension unnecessarily.",
                    ),
                    opt(
                        "Ignore situation and stay at your original post.",
                        10,
                        "Avoids immediate conflict, but leaves potential risk unmanaged.",
                    ),
                ],
            ),
            step(
                "act",
                Phase::Act,
                "The person calms slightly when you speak but still seems tense. Bystanders are watching. What action do you take?",
                Some(20),
                vec![
                    opt(
                        "Maintain distance, keep a clear path to leave, and continue calm but firm communication.",
                        100,
                        "You are managing risk, protecting bystanders, and preserving options.",
                    ),
                    opt(
                        "Abruptly end contact and walk away without notifying anyone.",
                        40,
                        "This may leave others exposed to risk you detected.",
                    ),
                    opt(
                        "Immediately escalate to physical control without further attempt to de-escalate.",
                        20,
                        "This skips remaining non-physical options and increases liability.",
                    ),
                ],
            ),
        ],
    }
}

fn crowd_at_the_gate() -> Scenario {
    Scenario {
        id: "crowd-at-the-gate".to_string(),
        title: "Crowd at the Gate".to_string(),
        summary: "A queue outside a venue turns restless after a delayed opening.".to_string(),
        tags: tags(&["crowd", "communication", "de-escalation"]),
        difficulty: Difficulty::Intermediate,
        steps: vec![
            step(
                "scan",
                Phase::Observe,
                "The doors are 30 minutes late. People at the front are pressing against the barrier. What do you check first?",
                Some(25),
                vec![
                    opt(
                        "Barrier load, crowd density near the front, and where people could be crushed.",
                        100,
                        "Density and pinch points are the main hazard in a pressing crowd.",
                    ),
                    opt(
                        "Which individuals are shouting the most.",
                        40,
                        "Loud people matter, but the physical pressure is the bigger risk.",
                    ),
                    opt(
                        "The venue's ticket scanners.",
                        10,
                        "That will not help with the immediate safety problem.",
                    ),
                ],
            ),
            step(
                "assess",
                Phase::Orient,
                "A staff member says the delay could last another 20 minutes. How do you frame the situation?",
                None,
                vec![
                    opt(
                        "A growing crowd-safety risk that needs information and pressure relief.",
                        100,
                        "Correct: frustration plus density escalates without intervention.",
                    ),
                    opt(
                        "A customer-service issue for the venue to handle.",
                        30,
                        "The safety dimension is yours to manage too.",
                    ),
                ],
            ),
            step(
                "plan",
                Phase::Decide,
                "You have two colleagues and a public-address system. What is your plan?",
                Some(30),
                vec![
                    opt(
                        "Announce the delay with a time estimate, open a second queue lane, and post colleagues at the pinch points.",
                        100,
                        "Information plus space reduces both frustration and density.",
                    ),
                    opt(
                        "Tell people to step back without giving a reason.",
                        40,
                        "Instructions without information are often ignored.",
                    ),
                    opt(
                        "Wait for the doors to open.",
                        0,
                        "Passive waiting lets the pressure keep building.",
                    ),
                ],
            ),
            step(
                "execute",
                Phase::Act,
                "After the announcement most people relax, but one group keeps pushing. What do you do?",
                Some(20),
                vec![
                    opt(
                        "Approach calmly with a colleague, explain the new lane, and guide them to it.",
                        100,
                        "Giving the group somewhere to go resolves the push without confrontation.",
                    ),
                    opt(
                        "Threaten to remove them from the queue.",
                        30,
                        "Threats can harden resistance in a frustrated group.",
                    ),
                ],
            ),
        ],
    }
}

fn lost_radio_contact() -> Scenario {
    Scenario {
        id: "lost-radio-contact".to_string(),
        title: "Lost Radio Contact".to_string(),
        summary: "A patrol partner stops answering the radio during a night shift.".to_string(),
        tags: tags(&["team", "communication", "OODA"]),
        difficulty: Difficulty::Advanced,
        steps: vec![
            step(
                "silence",
                Phase::Observe,
                "Your partner missed two scheduled check-ins. What information do you gather first?",
                Some(15),
                vec![
                    opt(
                        "Their last reported position, the time of last contact, and what their route covers.",
                        100,
                        "You now know where to look and how long they have been silent.",
                    ),
                    opt(
                        "Whether other channels are busy.",
                        50,
                        "Useful, but it does not tell you where your partner is.",
                    ),
                    opt(
                        "Nothing; radios fail all the time.",
                        0,
                        "Missed check-ins are exactly the signal the schedule exists to catch.",
                    ),
                ],
            ),
            step(
                "weigh",
                Phase::Orient,
                "The route passes an unlit loading bay where a break-in was reported last week. How do you read this?",
                Some(15),
                vec![
                    opt(
                        "Possible equipment failure, but the history raises the chance of a real incident.",
                        100,
                        "You hold both explanations while weighting the risk appropriately.",
                    ),
                    opt(
                        "Almost certainly a dead battery.",
                        30,
                        "Anchoring on the harmless explanation delays a response.",
                    ),
                ],
            ),
            step(
                "choose",
                Phase::Decide,
                "You can search alone now, or request a second unit that is five minutes away. What do you decide?",
                Some(15),
                vec![
                    opt(
                        "Request the second unit, notify control of the plan, and approach to a safe observation point.",
                        100,
                        "Backup, communication, and a safe vantage keep you effective.",
                    ),
                    opt(
                        "Go straight into the loading bay alone.",
                        20,
                        "Entering alone risks a second missing officer.",
                    ),
                    opt(
                        "Keep calling on the radio and wait.",
                        30,
                        "Repeated calls are fine, but waiting alone wastes time.",
                    ),
                ],
            ),
            step(
                "move",
                Phase::Act,
                "From the observation point you see your partner sitting on the ground, holding their ankle. What now?",
                None,
                vec![
                    opt(
                        "Report their status to control, check the area, then move in to give first aid.",
                        100,
                        "You keep everyone informed and make sure the scene is safe before committing.",
                    ),
                    opt(
                        "Run straight to them without checking the area.",
                        50,
                        "Understandable, but a quick scan first protects you both.",
                    ),
                ],
            ),
        ],
    }
}
