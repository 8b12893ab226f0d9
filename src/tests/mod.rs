mod test_reopen;
