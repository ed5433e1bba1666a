mod symbol_table_unit_test;
