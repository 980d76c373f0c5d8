use crate::config::Options;
use lazy_static::lazy_static;
use log::info;
use regex::Regex;

/// A change a command mail asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Deactivate,
    Activate,
    Ignore(String),
    Follow(String),
}

/// What a rule does with the body once its pattern matches.
enum Effect {
    /// Emit this action and stop evaluating rules.
    Toggle(Action),
    /// Emit one action per capture; later rules still run.
    Scan(fn(String) -> Action),
}

struct Rule {
    pattern: Regex,
    effect: Effect,
}

lazy_static! {
    // Evaluated top to bottom.
    static ref RULES: Vec<Rule> = vec![
        Rule {
            pattern: Regex::new(r"(?i)^off\w*").unwrap(),
            effect: Effect::Toggle(Action::Deactivate),
        },
        Rule {
            pattern: Regex::new(r"(?i)^on\w*").unwrap(),
            effect: Effect::Toggle(Action::Activate),
        },
        Rule {
            pattern: Regex::new(r"(?i)ignore (\w+)").unwrap(),
            effect: Effect::Scan(Action::Ignore),
        },
        Rule {
            pattern: Regex::new(r"(?i)follow (\w+)").unwrap(),
            effect: Effect::Scan(Action::Follow),
        },
    ];
}

/// Reads the commands out of a message body. Anything that doesn't match
/// just yields nothing. `off`/`on` must be the very first characters.
pub fn interpret(body: &str) -> Vec<Action> {
    let mut actions = Vec::new();

    for rule in RULES.iter() {
        match &rule.effect {
            Effect::Toggle(action) => {
                if rule.pattern.is_match(body) {
                    return vec![action.clone()];
                }
            }
            Effect::Scan(make) => actions.extend(
                rule.pattern
                    .captures_iter(body)
                    .map(|caps| make(caps[1].to_string())),
            ),
        }
    }

    actions
}

/// `Follow` removes the handle whether or not it was ever ignored.
pub fn apply(actions: &[Action], options: &mut Options) {
    for action in actions {
        match action {
            Action::Deactivate => options.active = false,
            Action::Activate => options.active = true,
            Action::Ignore(handle) => {
                options.no_follow.insert(handle.clone());
            }
            Action::Follow(handle) => {
                options.no_follow.remove(handle);
            }
        }
        info!("Received command: {}", action);
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Action::Deactivate => write!(f, "off"),
            Action::Activate => write!(f, "on"),
            Action::Ignore(handle) => write!(f, "ignore {}", handle),
            Action::Follow(handle) => write!(f, "follow {}", handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(body: &str, options: &mut Options) {
        apply(&interpret(body), options);
    }

    #[test]
    fn off_and_on() {
        let mut options = Options::default();
        run("OFF please", &mut options);
        assert!(!options.active);
        run("on", &mut options);
        assert!(options.active);
        run("Offline for a bit", &mut options);
        assert!(!options.active);
    }

    #[test]
    fn toggles_only_at_the_start() {
        assert!(interpret("turn it off").is_empty());
        assert!(interpret("  on\r\n").is_empty());
        assert!(interpret("\noff").is_empty());
        assert_eq!(interpret("on\r\n"), vec![Action::Activate]);
    }

    #[test]
    fn ignore_and_follow_in_one_body() {
        let mut options = Options::default();
        options.no_follow.insert("alice".to_string());

        run("ignore bob and follow alice", &mut options);
        assert!(options.no_follow.contains("bob"));
        assert!(!options.no_follow.contains("alice"));
        assert!(options.active);
    }

    #[test]
    fn every_occurrence_counts() {
        assert_eq!(
            interpret("Ignore bob, ignore carol. FOLLOW dave"),
            vec![
                Action::Ignore("bob".to_string()),
                Action::Ignore("carol".to_string()),
                Action::Follow("dave".to_string()),
            ]
        );
    }

    #[test]
    fn toggle_shadows_scans() {
        assert_eq!(interpret("off, and ignore bob"), vec![Action::Deactivate]);
    }

    #[test]
    fn follow_wins_over_ignore_for_same_handle() {
        let mut options = Options::default();
        run("follow bob ignore bob", &mut options);
        assert!(!options.no_follow.contains("bob"));
    }

    #[test]
    fn follow_without_prior_ignore_is_harmless() {
        let mut options = Options::default();
        run("follow zed", &mut options);
        assert!(options.no_follow.is_empty());
    }

    #[test]
    fn unrelated_text_changes_nothing() {
        let mut options = Options::default();
        run("hello", &mut options);
        assert_eq!(options, Options::default());
        assert!(interpret("").is_empty());
    }

    #[test]
    fn display_round_trips_through_interpret() {
        for action in [
            Action::Deactivate,
            Action::Activate,
            Action::Ignore("bob".to_string()),
            Action::Follow("bob".to_string()),
        ] {
            assert_eq!(interpret(&action.to_string()), vec![action]);
        }
    }
}
