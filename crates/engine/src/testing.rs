//! Shared test doubles.

use std::sync::Mutex;

use async_trait::async_trait;

use randolink_core::{Goal, LocationId, PlayerSlot, SessionOptions};
use randolink_session::{
    ClientError, ConnectionState, GrantCallback, SessionClient, SessionHello,
};

/// Records every outbound call without any networking.
#[derive(Default)]
pub(crate) struct RecordingClient {
    pub(crate) reported: Mutex<Vec<Vec<LocationId>>>,
    pub(crate) goals: Mutex<Vec<Goal>>,
    pub(crate) fail_reports: bool,
}

impl RecordingClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail_reports: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl SessionClient for RecordingClient {
    async fn connect(&self, options: &SessionOptions) -> Result<SessionHello, ClientError> {
        Ok(SessionHello {
            slot: PlayerSlot::new(options.slot_name.clone()),
            checked_locations: vec![],
            placements: Default::default(),
        })
    }

    async fn disconnect(&self) {}

    fn report_location_checked(&self, locations: Vec<LocationId>) -> Result<(), ClientError> {
        if self.fail_reports {
            return Err(ClientError::NotConnected);
        }
        self.reported.lock().unwrap().push(locations);
        Ok(())
    }

    fn report_goal_completed(&self, goal: Goal) -> Result<(), ClientError> {
        if self.fail_reports {
            return Err(ClientError::NotConnected);
        }
        self.goals.lock().unwrap().push(goal);
        Ok(())
    }

    fn sync_checked_locations(&self, locations: Vec<LocationId>) -> Result<(), ClientError> {
        self.report_location_checked(locations)
    }

    fn set_grant_callback(&self, _callback: GrantCallback) {}

    fn connection_state(&self) -> ConnectionState {
        ConnectionState::Connected
    }

    fn session_hello(&self) -> Option<SessionHello> {
        None
    }
}
