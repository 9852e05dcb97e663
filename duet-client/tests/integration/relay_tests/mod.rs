mod test_relay_client;
mod test_sync_over_relay;
