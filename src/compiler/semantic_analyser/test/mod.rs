mod scope_analysis_unit_test;
