mod interrupt_tests;
