//! Method and parameter names of the interactive protocol

// Lifecycle
pub const HELLO: &str = "hello";
pub const READY: &str = "ready";
pub const ON_READY: &str = "onReady";
pub const GET_TIME: &str = "getTime";
pub const SET_BANDWIDTH_THROTTLE: &str = "setBandwidthThrottle";

// Scenes
pub const GET_SCENES: &str = "getScenes";
pub const UPDATE_SCENES: &str = "updateScenes";

// Groups
pub const GET_GROUPS: &str = "getGroups";
pub const CREATE_GROUPS: &str = "createGroups";
pub const UPDATE_GROUPS: &str = "updateGroups";
pub const ON_GROUP_CREATE: &str = "onGroupCreate";
pub const ON_GROUP_UPDATE: &str = "onGroupUpdate";

// Controls
pub const UPDATE_CONTROLS: &str = "updateControls";
pub const ON_CONTROL_UPDATE: &str = "onControlUpdate";
pub const ON_CONTROL_CREATE: &str = "onControlCreate";
pub const ON_CONTROL_DELETE: &str = "onControlDelete";

// Participants
pub const UPDATE_PARTICIPANTS: &str = "updateParticipants";
pub const ON_PARTICIPANT_JOIN: &str = "onParticipantJoin";
pub const ON_PARTICIPANT_LEAVE: &str = "onParticipantLeave";
pub const ON_PARTICIPANT_UPDATE: &str = "onParticipantUpdate";

// Input
pub const GIVE_INPUT: &str = "giveInput";
pub const ON_INPUT: &str = "onInput";
pub const CAPTURE: &str = "capture";

/// Parameter and field keys
pub mod keys {
    pub const SCENE_ID: &str = "sceneID";
    pub const SCENES: &str = "scenes";
    pub const GROUP_ID: &str = "groupID";
    pub const GROUPS: &str = "groups";
    pub const CONTROL_ID: &str = "controlID";
    pub const CONTROLS: &str = "controls";
    pub const KIND: &str = "kind";
    pub const META: &str = "meta";
    pub const VALUE: &str = "value";
    pub const COOLDOWN: &str = "cooldown";
    pub const PARTICIPANT_ID: &str = "participantID";
    pub const PARTICIPANTS: &str = "participants";
    pub const SESSION_ID: &str = "sessionID";
    pub const TRANSACTION_ID: &str = "transactionID";
    pub const INPUT: &str = "input";
    pub const EVENT: &str = "event";
    pub const IS_READY: &str = "isReady";
    pub const TIME: &str = "time";
    pub const PRIORITY: &str = "priority";
    pub const CAPACITY: &str = "capacity";
    pub const DRAIN_RATE: &str = "drainRate";
    pub const ADDRESS: &str = "address";
}

/// Header names sent when opening the socket
pub mod headers {
    pub const AUTHORIZATION: &str = "Authorization";
    pub const PROTOCOL_VERSION: &str = "X-Protocol-Version";
    pub const INTERACTIVE_VERSION: &str = "X-Interactive-Version";
    pub const SHARE_CODE: &str = "X-Interactive-Sharecode";
}

/// Protocol version spoken by this client
pub const PROTOCOL_VERSION: &str = "2.0";

/// Collection key a batched method carries its entries under
pub fn collection_key(method: &str) -> Option<&'static str> {
    match method {
        UPDATE_CONTROLS => Some(keys::CONTROLS),
        UPDATE_PARTICIPANTS => Some(keys::PARTICIPANTS),
        CREATE_GROUPS | UPDATE_GROUPS => Some(keys::GROUPS),
        UPDATE_SCENES => Some(keys::SCENES),
        _ => None,
    }
}

/// Id field of one entry in a batched method's collection
pub fn entry_id_key(method: &str) -> Option<&'static str> {
    match method {
        UPDATE_CONTROLS => Some(keys::CONTROL_ID),
        UPDATE_PARTICIPANTS => Some(keys::SESSION_ID),
        CREATE_GROUPS | UPDATE_GROUPS => Some(keys::GROUP_ID),
        UPDATE_SCENES => Some(keys::SCENE_ID),
        _ => None,
    }
}
