//! Script snippets and DOM markers used against the remote page.
//!
//! The page's own object graph (`window.Store`, `window.WWebJS`) is an
//! opaque external service; these snippets are the only knowledge of it the
//! crate carries.

/// Entry URL of the web client.
pub const WEB_URL: &str = "https://web.whatsapp.com/";

/// DOM markers raced during authentication.
pub mod selectors {
    /// QR container, carrying the current token in `data-ref`.
    pub const QR_CONTAINER: &str = "div[data-ref]";
    /// Reload control rendered when a QR token goes stale.
    pub const QR_RETRY_BUTTON: &str = "div[data-ref] > span > button";
    /// Marker only present in the authenticated UI.
    pub const AUTHENTICATED_PANE: &str = "[data-icon=\"chat\"]";
}

/// Names of host functions exposed into the page context.
pub mod callbacks {
    pub const QR_CHANGED: &str = "onQrChange";
    pub const STORE_MUTATION: &str = "onStoreMutation";
}

/// Report the current QR token immediately, on every rotation, and
/// auto-click the retry control when the container is re-rendered.
pub const OBSERVE_QR: &str = r#"() => {
    const container = document.querySelector('div[data-ref]');
    window.onQrChange(container.getAttribute('data-ref'));
    const observer = new MutationObserver(mutations => {
        for (const mutation of mutations) {
            if (mutation.type === 'attributes' && mutation.attributeName === 'data-ref') {
                window.onQrChange(mutation.target.getAttribute('data-ref'));
            } else if (mutation.type === 'childList') {
                const retry = document.querySelector('div[data-ref] > span > button');
                if (retry) retry.click();
            }
        }
    });
    observer.observe(container.parentElement, {
        subtree: true,
        childList: true,
        attributes: true,
        attributeFilter: ['data-ref'],
    });
}"#;

/// Whether the in-page store object graph is usable yet.
pub const STORE_READY: &str =
    "() => Boolean(window.Store && window.Store.Msg && window.Store.Chat && window.Store.AppState)";

/// Subscribe store listeners and forward each mutation to the host sink as
/// a `{ kind, ... }` record.
pub const REGISTER_FORWARDERS: &str = r#"({ disableMessageHistory }) => {
    const forward = (kind, payload) => window.onStoreMutation(Object.assign({ kind }, payload));
    window.Store.Msg.on('add', msg =>
        forward('message_added', { message: window.WWebJS.getMessageModel(msg) }));
    window.Store.Msg.on('change', msg =>
        forward('message_changed', { message: window.WWebJS.getMessageModel(msg) }));
    window.Store.Msg.on('change:type', msg =>
        forward('message_type_changed', { message: window.WWebJS.getMessageModel(msg) }));
    window.Store.Msg.on('change:ack', (msg, ack) =>
        forward('message_ack_changed', { message: window.WWebJS.getMessageModel(msg), ack }));
    window.Store.Msg.on('change:isUnsentMedia', (msg, unsent) =>
        forward('message_media_uploaded', { message: window.WWebJS.getMessageModel(msg), unsent }));
    window.Store.Msg.on('remove', msg =>
        forward('message_removed', { message: window.WWebJS.getMessageModel(msg) }));
    window.Store.AppState.on('change:state', (_appState, state) =>
        forward('app_state_changed', { state }));
    window.Store.Call.on('add', call =>
        forward('call_added', { call: window.WWebJS.getCallModel(call) }));
    if (disableMessageHistory) window.Store.HistorySync.pause();
}"#;

/// One-shot fetch of client/runtime identity after the store is ready.
pub const RUNTIME_INFO: &str = r#"() => ({
    pushname: window.Store.Conn.pushname,
    wid: window.Store.User.getMeUser(),
    platform: window.Store.Conn.platform,
})"#;

pub const GET_STATE: &str = "() => window.Store.AppState.state";
pub const TAKEOVER: &str = "() => window.Store.AppState.takeover()";
pub const LOGOUT: &str = "() => window.Store.AppState.logout()";
pub const GET_WWEB_VERSION: &str = "() => window.Debug.VERSION";

pub const SEND_MESSAGE: &str =
    "({ chatId, message }) => window.WWebJS.sendMessage(chatId, message)";
pub const SEND_SEEN: &str = "({ chatId }) => window.WWebJS.sendSeen(chatId)";
/// Native webp sticker encoding inside the page; only valid for images.
pub const TO_STICKER: &str = "({ media }) => window.WWebJS.toStickerData(media)";

pub const SEARCH_MESSAGES: &str =
    "({ query, page, limit, chatId }) => window.WWebJS.searchMessages(query, page, limit, chatId)";
pub const GET_CHATS: &str = "() => window.WWebJS.getChats()";
pub const GET_CHAT_BY_ID: &str = "({ chatId }) => window.WWebJS.getChat(chatId)";
pub const GET_CONTACTS: &str = "() => window.WWebJS.getContacts()";
pub const GET_CONTACT_BY_ID: &str = "({ contactId }) => window.WWebJS.getContact(contactId)";

/// Resolves to the joined group id, or null for an invalid/expired code.
pub const ACCEPT_INVITE: &str = r#"({ code }) =>
    window.Store.GroupInvite.joinGroupViaInvite(code)
        .then(result => (result.gid ? result.gid._serialized : null))
        .catch(() => null)"#;
pub const GET_INVITE_INFO: &str =
    "({ code }) => window.Store.GroupInvite.queryGroupInvite(code)";
pub const ACCEPT_G4_INVITE: &str =
    "({ invite }) => window.Store.GroupInviteV4.joinGroupViaInviteV4(invite)";

pub const SET_STATUS: &str = "({ status }) => window.Store.StatusUtils.setMyStatus(status)";
pub const SET_DISPLAY_NAME: &str = "({ name }) => window.Store.Settings.setPushname(name)";

pub const ARCHIVE_CHAT: &str =
    "({ chatId, archive }) => window.WWebJS.archiveChat(chatId, archive)";
/// Pin state of one chat plus the number of currently pinned chats, read
/// before any pin mutation is attempted.
pub const CHAT_PIN_STATE: &str = r#"({ chatId }) => ({
    pinned: Boolean(window.Store.Chat.get(chatId).pin),
    pinnedCount: window.Store.Chat.getModelsArray().filter(chat => chat.pin).length,
})"#;
pub const PIN_CHAT: &str = "({ chatId, pin }) => window.WWebJS.pinChat(chatId, pin)";
pub const MUTE_CHAT: &str =
    "({ chatId, expiration }) => window.WWebJS.muteChat(chatId, expiration)";
pub const UNMUTE_CHAT: &str = "({ chatId }) => window.WWebJS.unmuteChat(chatId)";

pub const GET_PROFILE_PIC_URL: &str =
    "({ contactId }) => window.WWebJS.getProfilePicUrl(contactId)";
/// Resolves to the canonical id record for a number, or null when the
/// number is not registered.
pub const QUERY_NUMBER_ID: &str = r#"({ number }) =>
    window.Store.QueryExist(number).then(result => (result ? result.wid : null))"#;

pub const CREATE_GROUP: &str =
    "({ name, participantIds }) => window.WWebJS.createGroup(name, participantIds)";
pub const GET_COMMON_GROUPS: &str =
    "({ contactId }) => window.WWebJS.getCommonGroups(contactId)";

pub const GET_LABELS: &str = "() => window.WWebJS.getLabels()";
pub const GET_LABEL_BY_ID: &str = "({ labelId }) => window.WWebJS.getLabel(labelId)";
pub const GET_CHAT_LABELS: &str = "({ chatId }) => window.WWebJS.getChatLabels(chatId)";
pub const GET_CHATS_BY_LABEL: &str =
    "({ labelId }) => window.WWebJS.getChatsByLabelId(labelId)";
pub const GET_BLOCKED_CONTACTS: &str = "() => window.WWebJS.getBlockedContacts()";
