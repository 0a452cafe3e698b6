mod test_import;
