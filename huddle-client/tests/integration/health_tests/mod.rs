mod test_unrecoverable_peer_times_out;
