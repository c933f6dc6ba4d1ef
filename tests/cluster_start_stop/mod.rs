mod process_cluster_test;
