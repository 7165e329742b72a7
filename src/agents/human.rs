pub struct Human {
    view: Option<View>,
}

impl Human {
    pub fn new() -> Self {
        Self { view: None }
    }

    fn print_view(&self, view: &View) {
        println!();
        println!(
            "{}",
            format!("=== {} | Day {} ===", view.phase, view.day).bold()
        );
        println!(
            "You are {} ({}, {})",
            view.player_name.clone().cyan(),
            view.role,
            view.faction
        );
        if let Some(team) = &view.mafia_members {
            println!("{} {}", "Your team:".red(), team.join(", "));
        }
        println!("Players: {}", view.player_list.join(" | "));
        for message in &view.messages {
            println!("  {}", message);
        }
        for entry in &view.memory {
            match entry {
                MemoryEntry::InvestigationResult { day, target, result } => {
                    println!(
                        "  {}",
                        format!("[Night {}] {} is aligned with {}", day, target, result).yellow()
                    );
                }
                MemoryEntry::RolePeek { day, target, role } => {
                    println!(
                        "  {}",
                        format!("[Night {}] {} is the {}", day, target, role).yellow()
                    );
                }
            }
        }
        if let Some(accused) = &view.player_on_trial {
            println!("{}", format!("{} is on trial!", accused).red().bold());
        }
    }

    fn pick_target(&self, view: &View) -> Option<String> {
        let targets = view
            .alive_players
            .iter()
            .filter(|name| **name != view.player_name)
            .cloned()
            .collect::<Vec<String>>();
        if targets.is_empty() {
            return None;
        }
        let selection = Select::new()
            .with_prompt("Target ")
            .report(false)
            .items(targets.as_slice())
            .default(0)
            .interact()
            .unwrap();
        Some(targets[selection].clone())
    }

    fn speech(&self) -> String {
        Input::new()
            .with_prompt("Say ")
            .report(false)
            .allow_empty(true)
            .interact()
            .unwrap()
    }

    fn night(&self, view: &View) -> Action {
        if !view.can_act_tonight {
            println!("You have no night action. Sleeping.");
            return Action::Pass;
        }
        let choices = vec!["Use night action", "Pass"];
        let selection = Select::new()
            .with_prompt("Night falls ")
            .report(false)
            .items(choices.as_slice())
            .default(0)
            .interact()
            .unwrap();
        match choices[selection] {
            "Use night action" => Action::Night {
                target: self.pick_target(view),
            },
            _ => Action::Pass,
        }
    }

    fn discussion(&self, view: &View) -> Action {
        let choices = vec!["Speak", "Accuse", "Question", "Whisper", "Pass"];
        let selection = Select::new()
            .with_prompt("Your turn ")
            .report(false)
            .items(choices.as_slice())
            .default(0)
            .interact()
            .unwrap();
        match choices[selection] {
            "Speak" => Action::Speak {
                content: self.speech(),
            },
            "Accuse" => match self.pick_target(view) {
                Some(target) => Action::Accuse { target },
                None => Action::Pass,
            },
            "Question" => match self.pick_target(view) {
                Some(target) => Action::Question {
                    target,
                    content: self.speech(),
                },
                None => Action::Pass,
            },
            "Whisper" => match self.pick_target(view) {
                Some(target) => Action::Whisper {
                    target,
                    content: self.speech(),
                },
                None => Action::Pass,
            },
            _ => Action::Pass,
        }
    }

    fn final_vote(&self) -> Action {
        let choices = vec!["Guilty", "Innocent", "Abstain"];
        let selection = Select::new()
            .with_prompt("Your verdict ")
            .report(false)
            .items(choices.as_slice())
            .default(0)
            .interact()
            .unwrap();
        let ballot = match choices[selection] {
            "Guilty" => Ballot::Guilty,
            "Innocent" => Ballot::Innocent,
            _ => Ballot::Abstain,
        };
        Action::Vote {
            target: None,
            vote_type: Some(ballot),
        }
    }
}

impl Agent for Human {
    fn observe(&mut self, observation: &Observation) {
        match observation {
            Observation::Seated(view) => {
                self.print_view(view);
                self.view = Some((**view).clone());
            }
            Observation::Eliminated { message, .. } => {
                println!("{}", message.clone().red());
                self.view = None;
            }
        }
    }

    fn act(&mut self) -> Action {
        let Some(view) = self.view.clone() else {
            return Action::Pass;
        };
        match view.phase {
            Phase::Night => self.night(&view),
            Phase::DayDiscussion => self.discussion(&view),
            Phase::Defense => {
                println!("{}", "You are on trial. Defend yourself.".red().bold());
                Action::Speak {
                    content: self.speech(),
                }
            }
            Phase::FinalVote => self.final_vote(),
            Phase::Voting | Phase::GameOver => Action::Pass,
        }
    }
}

impl Default for Human {
    fn default() -> Self {
        Self::new()
    }
}

use super::Agent;
use crate::game::action::Action;
use crate::game::action::Ballot;
use crate::game::observation::Observation;
use crate::game::observation::View;
use crate::game::phase::Phase;
use crate::game::player::MemoryEntry;
use colored::Colorize;
use dialoguer::Input;
use dialoguer::Select;
