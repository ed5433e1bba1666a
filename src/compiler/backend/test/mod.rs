mod codegen_unit_test;
