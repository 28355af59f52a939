mod manifest_runs;
