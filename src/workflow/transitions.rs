// Transition table - the single authority on which (status, action, role)
// combinations are legal and what they do.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::principal::{Principal, Role};
use super::status::{ReportStatus, ReviewAction};

/// Side effect applied together with the status change, in the same write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    ClearRejectionNote,
    SetRejectionNote,
    StampKasiApproval,
    StampCdkApproval,
    StampDeletion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NextState {
    Status(ReportStatus),
    SoftDeleted,
}

impl fmt::Display for NextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextState::Status(status) => status.fmt(f),
            NextState::SoftDeleted => f.write_str("deleted"),
        }
    }
}

/// Why the table refused a combination. Users only ever see the generic
/// status-mismatch message; the distinction is for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No rule exists for this action at this status.
    WrongState,
    /// A rule exists but the actor's roles do not satisfy it.
    WrongRole,
}

impl Denial {
    pub fn reason(&self) -> &'static str {
        "not permitted in current state"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Transition {
        next: NextState,
        effects: &'static [Effect],
    },
    Illegal(Denial),
}

impl Outcome {
    pub fn next_state(&self) -> Option<NextState> {
        match self {
            Outcome::Transition { next, .. } => Some(*next),
            Outcome::Illegal(_) => None,
        }
    }
}

/// Who may fire a rule, beyond the coarse permission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActorRequirement {
    /// Any holder of the edit permission.
    Editor,
    /// Any holder of the delete permission.
    Deleter,
    /// The given review role, or admin.
    Reviewer(Role),
}

impl ActorRequirement {
    fn satisfied_by_role(&self, role: Role) -> bool {
        match self {
            ActorRequirement::Editor | ActorRequirement::Deleter => true,
            ActorRequirement::Reviewer(required) => role == Role::Admin || role == *required,
        }
    }

    fn satisfied_by(&self, actor: &Principal) -> bool {
        match self {
            ActorRequirement::Editor | ActorRequirement::Deleter => true,
            ActorRequirement::Reviewer(_) => actor.roles().any(|role| self.satisfied_by_role(role)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    requires: ActorRequirement,
    next: NextState,
    effects: &'static [Effect],
}

const SUBMIT_RULE: Rule = Rule {
    requires: ActorRequirement::Editor,
    next: NextState::Status(ReportStatus::WaitingKasi),
    effects: &[Effect::ClearRejectionNote],
};

const DELETE_RULE: Rule = Rule {
    requires: ActorRequirement::Deleter,
    next: NextState::SoftDeleted,
    effects: &[Effect::StampDeletion],
};

const fn reject_rule(reviewer: Role) -> Rule {
    Rule {
        requires: ActorRequirement::Reviewer(reviewer),
        next: NextState::Status(ReportStatus::Rejected),
        effects: &[Effect::SetRejectionNote],
    }
}

fn rule_for(status: ReportStatus, action: ReviewAction) -> Option<Rule> {
    use ReportStatus::*;

    match action {
        ReviewAction::Submit => match status {
            Draft | Rejected => Some(SUBMIT_RULE),
            WaitingKasi | WaitingCdk | Final => None,
        },
        ReviewAction::Approve => match status {
            WaitingKasi => Some(Rule {
                requires: ActorRequirement::Reviewer(Role::Kasi),
                next: NextState::Status(WaitingCdk),
                effects: &[Effect::StampKasiApproval],
            }),
            WaitingCdk => Some(Rule {
                requires: ActorRequirement::Reviewer(Role::Kacdk),
                next: NextState::Status(Final),
                effects: &[Effect::StampCdkApproval],
            }),
            Draft | Final | Rejected => None,
        },
        ReviewAction::Reject => match status {
            WaitingKasi => Some(reject_rule(Role::Kasi)),
            WaitingCdk => Some(reject_rule(Role::Kacdk)),
            Draft | Final | Rejected => None,
        },
        // Deleted records never reach the table: both executors filter them out.
        ReviewAction::Delete => Some(DELETE_RULE),
    }
}

/// Evaluate the table for a single role.
pub fn evaluate(status: ReportStatus, action: ReviewAction, role: Role) -> Outcome {
    match rule_for(status, action) {
        None => Outcome::Illegal(Denial::WrongState),
        Some(rule) if rule.requires.satisfied_by_role(role) => Outcome::Transition {
            next: rule.next,
            effects: rule.effects,
        },
        Some(_) => Outcome::Illegal(Denial::WrongRole),
    }
}

/// Pure legality query for listing/UI code.
pub fn is_legal_transition(
    status: ReportStatus,
    action: ReviewAction,
    role: Role,
) -> Option<NextState> {
    evaluate(status, action, role).next_state()
}

/// Evaluate the table for an actor holding any number of roles.
pub fn resolve(status: ReportStatus, action: ReviewAction, actor: &Principal) -> Outcome {
    match rule_for(status, action) {
        None => Outcome::Illegal(Denial::WrongState),
        Some(rule) if rule.requires.satisfied_by(actor) => Outcome::Transition {
            next: rule.next,
            effects: rule.effects,
        },
        Some(_) => Outcome::Illegal(Denial::WrongRole),
    }
}

/// The role under which a transition applies: admin when held, otherwise the
/// first role satisfying the rule. `None` when the actor carries no roles or
/// the combination is illegal.
pub fn effective_role(status: ReportStatus, action: ReviewAction, actor: &Principal) -> Option<Role> {
    if actor.is_admin() && rule_for(status, action).is_some() {
        return Some(Role::Admin);
    }
    actor
        .roles()
        .find(|role| matches!(evaluate(status, action, *role), Outcome::Transition { .. }))
}

/// One conditional update of a bulk operation: every row currently in one of
/// `expected` moves to `next` with `effects`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkStep {
    pub expected: Vec<ReportStatus>,
    pub next: NextState,
    pub effects: &'static [Effect],
}

impl BulkStep {
    pub fn matches_any_status(&self) -> bool {
        ReportStatus::ALL
            .iter()
            .all(|status| self.expected.contains(status))
    }
}

/// Derive the conditional updates a bulk action needs for this actor, straight
/// from the table. Steps are ordered latest pipeline stage first so that a row
/// advanced by one step can never match a later step of the same call.
/// An empty plan means the actor can move nothing; that is not an error.
pub fn bulk_plan(action: ReviewAction, actor: &Principal) -> Vec<BulkStep> {
    let mut steps: Vec<BulkStep> = Vec::new();

    for status in ReportStatus::ALL {
        if let Outcome::Transition { next, effects } = resolve(status, action, actor) {
            match steps
                .iter_mut()
                .find(|step| step.next == next && step.effects == effects)
            {
                Some(step) => step.expected.push(status),
                None => steps.push(BulkStep {
                    expected: vec![status],
                    next,
                    effects,
                }),
            }
        }
    }

    steps.sort_by_key(|step| {
        std::cmp::Reverse(step.expected.iter().map(|s| s.stage()).max().unwrap_or(0))
    });
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReportStatus::*;

    const ROLES: [Role; 4] = [Role::Admin, Role::Kasi, Role::Kacdk, Role::Operator];

    #[test]
    fn test_documented_rules() {
        assert_eq!(
            is_legal_transition(Draft, ReviewAction::Submit, Role::Operator),
            Some(NextState::Status(WaitingKasi))
        );
        assert_eq!(
            is_legal_transition(Rejected, ReviewAction::Submit, Role::Operator),
            Some(NextState::Status(WaitingKasi))
        );
        assert_eq!(
            is_legal_transition(WaitingKasi, ReviewAction::Approve, Role::Kasi),
            Some(NextState::Status(WaitingCdk))
        );
        assert_eq!(
            is_legal_transition(WaitingCdk, ReviewAction::Approve, Role::Kacdk),
            Some(NextState::Status(Final))
        );
        assert_eq!(
            is_legal_transition(WaitingKasi, ReviewAction::Reject, Role::Kasi),
            Some(NextState::Status(Rejected))
        );
        assert_eq!(
            is_legal_transition(WaitingCdk, ReviewAction::Reject, Role::Kacdk),
            Some(NextState::Status(Rejected))
        );
        for status in ReportStatus::ALL {
            assert_eq!(
                is_legal_transition(status, ReviewAction::Delete, Role::Operator),
                Some(NextState::SoftDeleted)
            );
        }
    }

    #[test]
    fn test_wrong_role_is_distinguished_from_wrong_state() {
        assert_eq!(
            evaluate(WaitingCdk, ReviewAction::Approve, Role::Kasi),
            Outcome::Illegal(Denial::WrongRole)
        );
        assert_eq!(
            evaluate(Final, ReviewAction::Approve, Role::Kacdk),
            Outcome::Illegal(Denial::WrongState)
        );
        assert_eq!(
            evaluate(Draft, ReviewAction::Reject, Role::Admin),
            Outcome::Illegal(Denial::WrongState)
        );
        assert_eq!(Denial::WrongRole.reason(), Denial::WrongState.reason());
    }

    #[test]
    fn test_admin_satisfies_every_existing_rule() {
        for status in ReportStatus::ALL {
            for action in ReviewAction::ALL {
                let any_role_allowed = ROLES
                    .iter()
                    .any(|role| is_legal_transition(status, action, *role).is_some());
                assert_eq!(
                    is_legal_transition(status, action, Role::Admin).is_some(),
                    any_role_allowed,
                    "admin mismatch at {status} / {action}"
                );
            }
        }
    }

    #[test]
    fn test_effects_follow_rules() {
        let Outcome::Transition { effects, .. } = evaluate(Rejected, ReviewAction::Submit, Role::Kasi)
        else {
            panic!("submit from rejected must be legal");
        };
        assert_eq!(effects, &[Effect::ClearRejectionNote]);

        let Outcome::Transition { effects, .. } = evaluate(WaitingCdk, ReviewAction::Approve, Role::Admin)
        else {
            panic!("admin approve at waiting_cdk must be legal");
        };
        assert_eq!(effects, &[Effect::StampCdkApproval]);
    }

    #[test]
    fn test_resolve_with_multiple_roles() {
        let both = Principal::new("u-1").with_role(Role::Kasi).with_role(Role::Kacdk);
        assert!(resolve(WaitingKasi, ReviewAction::Approve, &both).next_state().is_some());
        assert!(resolve(WaitingCdk, ReviewAction::Approve, &both).next_state().is_some());

        let nobody = Principal::new("u-2");
        assert_eq!(
            resolve(WaitingKasi, ReviewAction::Approve, &nobody),
            Outcome::Illegal(Denial::WrongRole)
        );
        // Submit only needs the edit permission, checked by the gate.
        assert!(resolve(Draft, ReviewAction::Submit, &nobody).next_state().is_some());
    }

    #[test]
    fn test_effective_role() {
        let admin = Principal::new("root").with_role(Role::Admin).with_role(Role::Kasi);
        assert_eq!(effective_role(WaitingKasi, ReviewAction::Approve, &admin), Some(Role::Admin));

        let kacdk = Principal::new("u-3").with_role(Role::Operator).with_role(Role::Kacdk);
        assert_eq!(effective_role(WaitingCdk, ReviewAction::Approve, &kacdk), Some(Role::Kacdk));
        assert_eq!(effective_role(WaitingKasi, ReviewAction::Approve, &kacdk), None);
    }

    #[test]
    fn test_bulk_plan_for_single_stage_reviewers() {
        let kasi = Principal::new("k").with_role(Role::Kasi);
        let plan = bulk_plan(ReviewAction::Approve, &kasi);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].expected, vec![WaitingKasi]);
        assert_eq!(plan[0].next, NextState::Status(WaitingCdk));

        let kacdk = Principal::new("c").with_role(Role::Kacdk);
        let plan = bulk_plan(ReviewAction::Reject, &kacdk);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].expected, vec![WaitingCdk]);
    }

    #[test]
    fn test_bulk_plan_orders_latest_stage_first() {
        let admin = Principal::new("root").with_role(Role::Admin);
        let plan = bulk_plan(ReviewAction::Approve, &admin);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].expected, vec![WaitingCdk]);
        assert_eq!(plan[1].expected, vec![WaitingKasi]);

        // Reject shares one target, so admin gets a single step.
        let plan = bulk_plan(ReviewAction::Reject, &admin);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].expected, vec![WaitingKasi, WaitingCdk]);
    }

    #[test]
    fn test_bulk_plan_for_submit_and_delete() {
        let operator = Principal::new("op").with_role(Role::Operator);

        let plan = bulk_plan(ReviewAction::Submit, &operator);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].expected, vec![Draft, Rejected]);
        assert!(!plan[0].matches_any_status());

        let plan = bulk_plan(ReviewAction::Delete, &operator);
        assert_eq!(plan.len(), 1);
        assert!(plan[0].matches_any_status());
        assert_eq!(plan[0].next, NextState::SoftDeleted);
    }

    #[test]
    fn test_bulk_plan_empty_for_non_reviewer() {
        let operator = Principal::new("op").with_role(Role::Operator);
        assert!(bulk_plan(ReviewAction::Approve, &operator).is_empty());
    }
}
