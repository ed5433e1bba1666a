mod unit_eel_parser;
