mod test_screen_share_denied;
mod test_screen_request_pending;
mod test_screen_share_ended_externally;
