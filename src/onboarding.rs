// SPDX-License-Identifier: GPL-3.0-only

//! Onboarding workflow state machine
//!
//! Drives the create-or-join dialog flow fed by the scan pipeline. The
//! machine owns its side-effect seams as traits: [`ScanControl`] to
//! start/stop code acquisition, and [`GroupService`] for the backend
//! calls that actually create or join a group (fire-and-forget here;
//! their outcome handling belongs to the surrounding application).
//!
//! `Closed` is a reset transition, not a resting state: every path into
//! it clears the pending fields and lands back in `Initial`.

use crate::scan::JoinToken;
use tracing::{debug, info};

/// Workflow states of the onboarding dialog flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingState {
    /// Choosing between creating and joining
    Initial,
    /// Entering a name for a new group
    CreatingGroup,
    /// Group creation submitted
    CreateSuccess,
    /// Scanning for a join code
    JoiningGroup,
    /// A join code was accepted
    JoinSuccess,
    /// Transient reset state; immediately re-enters `Initial`
    Closed,
}

impl std::fmt::Display for OnboardingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OnboardingState::Initial => "initial",
            OnboardingState::CreatingGroup => "creating-group",
            OnboardingState::CreateSuccess => "create-success",
            OnboardingState::JoiningGroup => "joining-group",
            OnboardingState::JoinSuccess => "join-success",
            OnboardingState::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

/// Events the flow reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnboardingEvent {
    /// User chose to create a group
    ChooseCreate,
    /// User chose to join a group by scanning
    ChooseJoin,
    /// Name field edited while creating
    NameChanged(String),
    /// Name submitted
    SubmitName,
    /// Back-navigation from the create or join screen
    Back,
    /// The scan gate delivered a token
    TokenDetected(JoinToken),
    /// "Invite others" picked on the create success screen
    PickInvite,
    /// "View groups" picked on the create success screen
    PickView,
    /// Join success acknowledged
    Acknowledge,
    /// The surface was dismissed
    Dismiss,
}

/// Acquisition start/stop seam the flow drives
///
/// Starting always re-arms the delivery gate; stopping is synchronous
/// for new frames. Implemented by `ScanSession`; tests substitute fakes.
pub trait ScanControl: Send {
    fn start(&mut self);
    fn stop(&mut self);
    /// Whether acquisition is currently running
    fn is_active(&self) -> bool;
}

/// Backend collaborator creating and joining groups
///
/// Both calls are fire-and-forget from the flow's perspective; success
/// and failure handling is delegated to the surrounding application.
pub trait GroupService: Send {
    fn create_group(&self, name: &str);
    fn join_group(&self, token: &str);
}

/// The onboarding dialog flow
///
/// Created when the onboarding surface opens, dropped when it is
/// dismissed. Events may arrive from the UI and from decode tasks (via a
/// channel); the machine itself is single-threaded.
pub struct OnboardingFlow {
    state: OnboardingState,
    pending_group_name: String,
    pending_token: String,
    scan: Box<dyn ScanControl>,
    groups: Box<dyn GroupService>,
}

impl OnboardingFlow {
    pub fn new(scan: Box<dyn ScanControl>, groups: Box<dyn GroupService>) -> Self {
        Self {
            state: OnboardingState::Initial,
            pending_group_name: String::new(),
            pending_token: String::new(),
            scan,
            groups,
        }
    }

    pub fn state(&self) -> OnboardingState {
        self.state
    }

    /// Name entered so far; non-empty only while creating or just created
    pub fn pending_group_name(&self) -> &str {
        &self.pending_group_name
    }

    /// Accepted join code; non-empty only in `JoinSuccess`
    pub fn pending_token(&self) -> &str {
        &self.pending_token
    }

    /// Whether code acquisition is currently running
    ///
    /// True only in `JoiningGroup`'s scanning sub-state.
    pub fn is_scanning(&self) -> bool {
        self.scan.is_active()
    }

    /// Feed one event through the machine
    pub fn handle(&mut self, event: OnboardingEvent) {
        use OnboardingEvent as E;
        use OnboardingState as S;

        match (self.state, event) {
            (S::Initial, E::ChooseCreate) => self.transition(S::CreatingGroup),
            (S::Initial, E::ChooseJoin) => {
                // Entering the scanning sub-state re-arms the gate and
                // (re)starts the frame source.
                self.scan.start();
                self.transition(S::JoiningGroup);
            }

            (S::CreatingGroup, E::NameChanged(name)) => {
                self.pending_group_name = name;
            }
            (S::CreatingGroup, E::SubmitName) => {
                let name = self.pending_group_name.trim().to_string();
                if name.is_empty() {
                    debug!("Blank group name rejected");
                    return;
                }
                self.groups.create_group(&name);
                self.transition(S::CreateSuccess);
            }
            (S::CreatingGroup, E::Back) => {
                self.pending_group_name.clear();
                self.transition(S::Initial);
            }

            (S::CreateSuccess, E::PickInvite) | (S::CreateSuccess, E::PickView) => {
                self.close();
            }

            (S::JoiningGroup, E::TokenDetected(token)) => {
                self.scan.stop();
                self.pending_token = token.into_string();
                self.groups.join_group(&self.pending_token);
                self.transition(S::JoinSuccess);
            }
            (S::JoiningGroup, E::Back) => {
                // Leaving the scanning sub-state by any path stops the
                // source; the gate re-arms with the stop.
                self.scan.stop();
                self.pending_token.clear();
                self.transition(S::Initial);
            }

            (S::JoinSuccess, E::Acknowledge) => self.close(),

            (_, E::Dismiss) => self.close(),

            // Everything else is ignored: late token deliveries after
            // leaving the scan screen, stray UI events, and attempts to
            // reach create/join from anywhere but Initial.
            (state, event) => {
                debug!(state = %state, event = ?event, "Event ignored");
            }
        }
    }

    fn transition(&mut self, to: OnboardingState) {
        info!(from = %self.state, to = %to, "Onboarding transition");
        self.state = to;
    }

    /// Reset through `Closed` back to `Initial`
    fn close(&mut self) {
        if self.scan.is_active() {
            self.scan.stop();
        }
        self.transition(OnboardingState::Closed);
        self.pending_group_name.clear();
        self.pending_token.clear();
        self.transition(OnboardingState::Initial);
    }
}
